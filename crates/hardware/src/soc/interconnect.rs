//! System interconnect description.
//!
//! This module records the buses, bridges and port links of a composed
//! system. Nothing here moves data; the engine instantiates these objects.
//! It provides:
//! 1. **Buses:** The memory bus, the I/O crossbar and the cache crossbars.
//! 2. **I/O path:** The I/O bridge plus either an I/O cache or a DMA bridge.
//! 3. **Links:** An ordered list of `owner.port -> owner.port` connections.

use std::fmt;

use crate::common::constants::BRIDGE_DELAY_NS;
use crate::common::{Frequency, MemoryRange};
use crate::core::units::cache::CacheSpec;

/// Name of the system memory bus.
pub const MEMBUS: &str = "membus";

/// Name of the system I/O crossbar.
pub const IOBUS: &str = "iobus";

/// Name of the shared L3 crossbar.
pub const L3_BUS: &str = "toL3Bus";

/// Bus flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusKind {
    /// Coherent system memory bus.
    MemBus,
    /// Non-coherent I/O crossbar.
    IoXBar,
    /// Crossbar in front of a cluster's L2.
    L2XBar {
        /// Data width in bytes.
        width: u32,
    },
    /// Crossbar in front of the shared L3.
    L3XBar {
        /// Data width in bytes.
        width: u32,
    },
}

/// A named bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bus {
    /// Object name.
    pub name: String,
    /// Bus flavour.
    pub kind: BusKind,
    /// Clock the bus runs at; `None` inherits the system clock.
    pub clock: Option<Frequency>,
}

/// A bridge between two buses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bridge {
    /// Object name.
    pub name: String,
    /// Forwarding delay in nanoseconds.
    pub delay_ns: u32,
    /// Address ranges forwarded; empty forwards everything.
    pub ranges: Vec<MemoryRange>,
}

impl Bridge {
    fn new(name: &str, ranges: Vec<MemoryRange>) -> Self {
        Self {
            name: name.to_string(),
            delay_ns: BRIDGE_DELAY_NS,
            ranges,
        }
    }
}

/// How device DMA reaches memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DmaPath {
    /// An I/O cache covering the system memory ranges.
    IoCache {
        /// Cache geometry.
        cache: CacheSpec,
        /// Address ranges the cache serves.
        ranges: Vec<MemoryRange>,
    },
    /// A plain bridge forwarding the system memory ranges.
    Bridge(Bridge),
}

impl DmaPath {
    /// Object name of the DMA path.
    pub fn name(&self) -> &str {
        match self {
            Self::IoCache { .. } => "iocache",
            Self::Bridge(bridge) => &bridge.name,
        }
    }
}

/// One port connection: `from` is the requesting side, `to` the responding side.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    /// Requesting `owner.port`.
    pub from: String,
    /// Responding `owner.port`.
    pub to: String,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Buses, bridges and links of a system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interconnect {
    buses: Vec<Bus>,
    /// Bridge from the memory bus to the I/O bus.
    pub io_bridge: Bridge,
    /// Device DMA path from the I/O bus to the memory bus.
    pub dma: DmaPath,
    links: Vec<Link>,
}

impl Interconnect {
    /// Creates the system buses and the I/O path, wired as a classic memory
    /// system: CPUs reach devices through the I/O bridge and devices reach
    /// memory through the I/O cache (`io_cache`) or a DMA bridge.
    pub fn new(mem_ranges: &[MemoryRange], io_cache: Option<CacheSpec>) -> Self {
        let dma = match io_cache {
            Some(cache) => DmaPath::IoCache {
                cache,
                ranges: mem_ranges.to_vec(),
            },
            None => DmaPath::Bridge(Bridge::new("dmabridge", mem_ranges.to_vec())),
        };
        let mut ic = Self {
            buses: vec![
                Bus {
                    name: MEMBUS.to_string(),
                    kind: BusKind::MemBus,
                    clock: None,
                },
                Bus {
                    name: IOBUS.to_string(),
                    kind: BusKind::IoXBar,
                    clock: None,
                },
            ],
            io_bridge: Bridge::new("iobridge", Vec::new()),
            dma,
            links: Vec::new(),
        };

        ic.link("iobridge.mem_side_port", "iobus.cpu_side_ports");
        ic.link("membus.mem_side_ports", "iobridge.cpu_side_port");
        let dma_name = ic.dma.name().to_string();
        let (mem_port, cpu_port) = match ic.dma {
            DmaPath::IoCache { .. } => ("mem_side", "cpu_side"),
            DmaPath::Bridge(_) => ("mem_side_port", "cpu_side_port"),
        };
        ic.link(&format!("{dma_name}.{mem_port}"), "membus.cpu_side_ports");
        ic.link("iobus.mem_side_ports", &format!("{dma_name}.{cpu_port}"));
        ic.link("system_port", "membus.cpu_side_ports");
        ic
    }

    /// Adds a bus.
    pub fn add_bus(&mut self, bus: Bus) {
        self.buses.push(bus);
    }

    /// Records a link from a requesting port to a responding port.
    pub fn link(&mut self, from: &str, to: &str) {
        self.links.push(Link {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    /// All buses, in creation order.
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    /// Looks up a bus by name.
    pub fn bus(&self, name: &str) -> Option<&Bus> {
        self.buses.iter().find(|b| b.name == name)
    }

    /// All links, in wiring order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns `true` if `from` is linked to `to`.
    pub fn is_linked(&self, from: &str, to: &str) -> bool {
        self.links.iter().any(|l| l.from == from && l.to == to)
    }

    /// Links whose requesting side belongs to `owner`.
    pub fn links_from<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .iter()
            .filter(move |l| {
                l.from
                    .strip_prefix(owner)
                    .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}
