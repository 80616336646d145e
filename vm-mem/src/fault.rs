//! 缺页处理
//!
//! 页表未命中时决定分配新帧还是置换，并同时更新页表和置换状态。

use crate::aging::{AgingState, Eviction};
use crate::page_table::PageTable;
use crate::{FrameNumber, VirtAddr};

/// 缺页的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// 页已驻留，无需处理
    AlreadyResident,
    /// 分配了一个未使用的帧
    Allocated,
    /// 换出了一个页并复用其帧
    Evicted(Eviction),
}

/// 缺页处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultResolution {
    pub frame: FrameNumber,
    pub kind: FaultKind,
}

impl FaultResolution {
    pub fn faulted(&self) -> bool {
        !matches!(self.kind, FaultKind::AlreadyResident)
    }

    pub fn eviction(&self) -> Option<Eviction> {
        match self.kind {
            FaultKind::Evicted(eviction) => Some(eviction),
            _ => None,
        }
    }
}

/// 确保 `va` 所在的页驻留在某个物理帧中
pub fn resolve_fault(
    page_table: &mut PageTable,
    aging: &mut AgingState,
    va: VirtAddr,
) -> FaultResolution {
    let vpn = page_table.layout().vpn(va);

    if let Some(index) = aging.find(vpn) {
        return FaultResolution {
            frame: aging.resident()[index].frame,
            kind: FaultKind::AlreadyResident,
        };
    }

    if aging.has_free_frame() {
        let frame = aging.allocate(vpn);
        page_table.insert(va, frame);
        return FaultResolution {
            frame,
            kind: FaultKind::Allocated,
        };
    }

    // 帧预算 >= 1 由配置校验保证，预算用尽时驻留集合必然非空
    let Some(victim) = aging.choose_victim() else {
        unreachable!("frame budget exhausted with no resident pages");
    };
    let eviction = aging.replace(victim, vpn);
    let victim_va = page_table.layout().vpn_to_address(eviction.vpn);
    page_table.invalidate(victim_va);
    page_table.insert(va, eviction.frame);

    log::debug!(
        "Evicted vpn {:#x} (age {:#06x}) from frame {} for vpn {:#x}",
        eviction.vpn,
        eviction.age,
        eviction.frame,
        vpn
    );

    FaultResolution {
        frame: eviction.frame,
        kind: FaultKind::Evicted(eviction),
    }
}
