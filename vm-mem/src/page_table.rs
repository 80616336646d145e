//! 多级页表
//!
//! 稀疏的 N 级前缀树：中间级保存子级的所有权槽位，最后一级
//! （叶子级）保存页映射。除根节点外，所有节点和槽位数组都在
//! 第一次插入时按需分配；运行期间节点从不释放，只会把映射置为无效。

use crate::error::ConfigError;
use crate::layout::AddressLayout;
use crate::{FrameNumber, VirtAddr};

/// 叶子级中的一个页映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMapping {
    /// 物理帧号
    pub frame: FrameNumber,
    /// 是否有效
    pub valid: bool,
}

impl PageMapping {
    /// 未映射的槽位
    pub const UNMAPPED: Self = Self {
        frame: FrameNumber::MAX,
        valid: false,
    };

    pub fn mapped(frame: FrameNumber) -> Self {
        Self { frame, valid: true }
    }
}

/// 页表中的一级节点
#[derive(Debug)]
pub enum Level {
    /// 中间级：子节点槽位
    Interior {
        entry_count: usize,
        children: Option<Box<[Option<Box<Level>>]>>,
    },
    /// 叶子级：页映射槽位
    Leaf {
        entry_count: usize,
        mappings: Option<Box<[PageMapping]>>,
    },
}

impl Level {
    /// 为第 `depth` 级创建节点，槽位数组延迟到第一次插入时分配
    fn new(layout: &AddressLayout, depth: usize) -> Self {
        let entry_count = layout.entry_count(depth);
        if depth + 1 == layout.level_count() {
            Level::Leaf {
                entry_count,
                mappings: None,
            }
        } else {
            Level::Interior {
                entry_count,
                children: None,
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Level::Leaf { .. })
    }

    pub fn entry_count(&self) -> usize {
        match self {
            Level::Interior { entry_count, .. } | Level::Leaf { entry_count, .. } => *entry_count,
        }
    }

    /// 非空子槽位数 + 有效映射数（递归）
    fn census(&self) -> u64 {
        match self {
            Level::Interior {
                children: Some(slots),
                ..
            } => slots.iter().flatten().map(|child| 1 + child.census()).sum(),
            Level::Leaf {
                mappings: Some(slots),
                ..
            } => slots.iter().filter(|mapping| mapping.valid).count() as u64,
            _ => 0,
        }
    }

    /// 以本节点为根的已分配节点数
    fn node_count(&self) -> u64 {
        match self {
            Level::Interior {
                children: Some(slots),
                ..
            } => 1 + slots.iter().flatten().map(|child| child.node_count()).sum::<u64>(),
            _ => 1,
        }
    }
}

/// 多级页表
#[derive(Debug)]
pub struct PageTable {
    layout: AddressLayout,
    root: Level,
}

impl PageTable {
    /// 创建页表，只分配根节点
    pub fn new(layout: AddressLayout) -> Self {
        let root = Level::new(&layout, 0);
        Self { layout, root }
    }

    pub fn from_level_bits(level_bits: &[u32]) -> Result<Self, ConfigError> {
        Ok(Self::new(AddressLayout::new(level_bits)?))
    }

    pub fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    pub fn root(&self) -> &Level {
        &self.root
    }

    /// 查找虚拟地址的有效映射，不分配任何节点
    pub fn lookup(&self, va: VirtAddr) -> Option<&PageMapping> {
        let mut level = &self.root;
        for depth in 0..self.layout.level_count() {
            let index = self.layout.level_index(va, depth) as usize;
            match level {
                Level::Interior { children, .. } => {
                    level = children.as_ref()?[index].as_deref()?;
                }
                Level::Leaf { mappings, .. } => {
                    let mapping = &mappings.as_ref()?[index];
                    return mapping.valid.then_some(mapping);
                }
            }
        }
        None
    }

    /// 翻译虚拟地址，返回帧号
    pub fn translate(&self, va: VirtAddr) -> Option<FrameNumber> {
        self.lookup(va).map(|mapping| mapping.frame)
    }

    /// 插入映射，沿途缺失的节点和槽位数组按需分配
    pub fn insert(&mut self, va: VirtAddr, frame: FrameNumber) {
        let layout = &self.layout;
        let mut level = &mut self.root;
        for depth in 0..layout.level_count() {
            let index = layout.level_index(va, depth) as usize;
            match level {
                Level::Interior {
                    entry_count,
                    children,
                } => {
                    let slots = children.get_or_insert_with(|| {
                        std::iter::repeat_with(|| None).take(*entry_count).collect()
                    });
                    let child = slots[index].get_or_insert_with(|| {
                        log::debug!("Allocating page table level {} for {:#010x}", depth + 1, va);
                        Box::new(Level::new(layout, depth + 1))
                    });
                    level = &mut **child;
                }
                Level::Leaf {
                    entry_count,
                    mappings,
                } => {
                    let slots = mappings.get_or_insert_with(|| {
                        vec![PageMapping::UNMAPPED; *entry_count].into_boxed_slice()
                    });
                    slots[index] = PageMapping::mapped(frame);
                    return;
                }
            }
        }
    }

    /// 把虚拟地址的映射置为无效
    ///
    /// 节点不会被释放，也不会为不存在的路径分配节点。
    /// 返回此前是否存在有效映射。
    pub fn invalidate(&mut self, va: VirtAddr) -> bool {
        match self.mapping_mut(va) {
            Some(mapping) => {
                let was_valid = mapping.valid;
                *mapping = PageMapping::UNMAPPED;
                was_valid
            }
            None => false,
        }
    }

    fn mapping_mut(&mut self, va: VirtAddr) -> Option<&mut PageMapping> {
        let layout = &self.layout;
        let mut level = &mut self.root;
        for depth in 0..layout.level_count() {
            let index = layout.level_index(va, depth) as usize;
            match level {
                Level::Interior { children, .. } => {
                    level = children.as_mut()?[index].as_deref_mut()?;
                }
                Level::Leaf { mappings, .. } => {
                    return mappings.as_mut().map(|slots| &mut slots[index]);
                }
            }
        }
        None
    }

    /// 页表结构统计：所有中间级的非空子槽位数 + 叶子级的有效映射数
    pub fn entry_count(&self) -> u64 {
        self.root.census()
    }

    /// 已分配的节点数（含根节点）
    pub fn allocated_levels(&self) -> u64 {
        self.root.node_count()
    }
}
