//! 模拟驱动
//!
//! 对每个虚拟地址依次执行：时钟前进（可能触发老化）-> 页表查找 ->
//! 命中返回帧号 / 未命中进入缺页处理 -> 记录访问 -> 生成访问事件。

use serde::Serialize;

use crate::aging::{AgingState, Eviction};
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::fault::resolve_fault;
use crate::layout::AddressLayout;
use crate::page_table::PageTable;
use crate::{FrameNumber, PhysAddr, VirtAddr, Vpn};

/// 单次地址访问的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEvent {
    pub virtual_address: VirtAddr,
    pub vpn: Vpn,
    pub offset: u32,
    pub frame: FrameNumber,
    pub physical_address: PhysAddr,
    /// 页表命中
    pub hit: bool,
    /// 发生了帧分配或置换
    pub faulted: bool,
    /// 置换信息
    pub eviction: Option<Eviction>,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub addresses: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// 运行结束时的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub page_size: u64,
    pub addresses: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub frames_allocated: FrameNumber,
    pub page_table_entries: u64,
}

impl Summary {
    /// 命中率（百分比），未处理任何地址时为 0
    pub fn hit_rate(&self) -> f64 {
        Self::percent(self.hits, self.addresses)
    }

    pub fn miss_rate(&self) -> f64 {
        Self::percent(self.misses, self.addresses)
    }

    fn percent(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            part as f64 / total as f64 * 100.0
        }
    }
}

/// 分页模拟器
#[derive(Debug)]
pub struct Simulator {
    page_table: PageTable,
    aging: AgingState,
    stats: SimStats,
}

impl Simulator {
    /// 校验配置并创建模拟器
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        let layout = AddressLayout::new(&config.level_bits)?;
        let max_frames = config.frame_budget()?;
        let interval = config.interval()?;

        log::info!(
            "Paging simulator: levels {:?}, {} offset bits, frames {}, aging interval {}",
            config.level_bits,
            layout.offset_bits(),
            max_frames.map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
            interval
        );

        Ok(Self {
            page_table: PageTable::new(layout),
            aging: AgingState::new(max_frames, interval),
            stats: SimStats::default(),
        })
    }

    pub fn layout(&self) -> &AddressLayout {
        self.page_table.layout()
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn aging(&self) -> &AgingState {
        &self.aging
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// 处理一个虚拟地址
    pub fn access(&mut self, va: VirtAddr) -> AccessEvent {
        self.stats.addresses += 1;
        self.aging.tick();

        let layout = self.page_table.layout();
        let vpn = layout.vpn(va);
        let offset = layout.offset(va);

        let (frame, hit, faulted, eviction) = match self.page_table.translate(va) {
            Some(frame) => {
                self.stats.hits += 1;
                (frame, true, false, None)
            }
            None => {
                self.stats.misses += 1;
                let resolution = resolve_fault(&mut self.page_table, &mut self.aging, va);
                let eviction = resolution.eviction();
                if eviction.is_some() {
                    self.stats.evictions += 1;
                }
                (resolution.frame, false, resolution.faulted(), eviction)
            }
        };

        let noted = self.aging.note_access(vpn, frame);
        debug_assert!(noted, "vpn {vpn:#x} mapped to frame {frame} has no resident record");

        let event = AccessEvent {
            virtual_address: va,
            vpn,
            offset,
            frame,
            physical_address: self.page_table.layout().physical_address(frame, offset),
            hit,
            faulted,
            eviction,
        };
        log::trace!(
            "{:#010x} -> {:#010x} ({})",
            va,
            event.physical_address,
            if hit { "hit" } else { "miss" }
        );
        event
    }

    /// 依次处理地址流，最多处理 `limit` 个地址
    ///
    /// 达到上限后不再从 `addresses` 读取。地址流或 `on_access` 返回的错误
    /// 会中止运行并原样返回。返回实际处理的地址数。
    pub fn run<I, E, F>(&mut self, addresses: I, limit: Option<u64>, mut on_access: F) -> Result<u64, E>
    where
        I: IntoIterator<Item = Result<VirtAddr, E>>,
        F: FnMut(&AccessEvent) -> Result<(), E>,
    {
        let mut addresses = addresses.into_iter();
        let mut processed = 0u64;

        while limit.is_none_or(|limit| processed < limit) {
            let Some(address) = addresses.next() else {
                break;
            };
            let event = self.access(address?);
            on_access(&event)?;
            processed += 1;
        }

        log::info!(
            "Processed {} addresses: {} hits, {} misses, {} evictions",
            processed,
            self.stats.hits,
            self.stats.misses,
            self.stats.evictions
        );
        Ok(processed)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            page_size: self.layout().page_size(),
            addresses: self.stats.addresses,
            hits: self.stats.hits,
            misses: self.stats.misses,
            evictions: self.stats.evictions,
            frames_allocated: self.aging.frames_allocated(),
            page_table_entries: self.page_table.entry_count(),
        }
    }
}
