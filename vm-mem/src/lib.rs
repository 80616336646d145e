//! vm-mem: 多级页表与 Aging 页面置换模拟核心
//!
//! 给定一串虚拟地址和每一级页表占用的地址位数，模拟
//! 虚拟地址 -> 物理地址的翻译过程，并在有限的物理帧预算下
//! 使用 Aging 算法进行页面置换。
//!
//! - [`layout`]: 地址位切分（每级掩码/移位、页内偏移）
//! - [`page_table`]: 稀疏、按需分配的多级页表
//! - [`aging`]: 驻留页记录、老化时钟与牺牲页选择
//! - [`fault`]: 缺页处理（分配新帧或置换）
//! - [`simulator`]: 逐地址驱动以上组件并统计结果

pub mod aging;
pub mod config;
pub mod error;
pub mod fault;
pub mod layout;
pub mod page_table;
pub mod simulator;

pub use aging::{AGE_MSB, AgingState, Eviction, ResidentPage};
pub use config::SimConfig;
pub use error::ConfigError;
pub use fault::{FaultKind, FaultResolution, resolve_fault};
pub use layout::{ADDRESS_BITS, AddressLayout};
pub use page_table::{Level, PageMapping, PageTable};
pub use simulator::{AccessEvent, SimStats, Simulator, Summary};

/// 虚拟地址（32 位）
pub type VirtAddr = u32;
/// 物理地址（32 位）
pub type PhysAddr = u32;
/// 虚拟页号：去掉页内偏移后的虚拟地址
pub type Vpn = u32;
/// 物理帧号
pub type FrameNumber = u32;
