//! Aging 页面置换
//!
//! 每个驻留页维护一个 16 位的 age 位串。每经过 `interval` 次访问，
//! 所有驻留页的位串右移一位；若该页在刚结束的周期内被访问过，
//! 则把最高位置 1。需要置换时，选择 age 最小的页，age 相同时选择
//! 最后访问时间最早的页，二者都相同时选择存储顺序中最靠前的页。

use std::num::NonZeroU32;

use serde::Serialize;

use crate::{FrameNumber, Vpn};

/// age 位串的最高位
pub const AGE_MSB: u16 = 0x8000;

/// 驻留页记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentPage {
    /// 完整虚拟页号
    pub vpn: Vpn,
    /// 分配的物理帧号
    pub frame: FrameNumber,
    /// age 位串
    pub age: u16,
    /// 最后访问的逻辑时间
    pub last_access: u64,
    /// 本周期内是否被访问过
    pub accessed: bool,
}

impl ResidentPage {
    fn fresh(vpn: Vpn, frame: FrameNumber, now: u64) -> Self {
        Self {
            vpn,
            frame,
            age: AGE_MSB,
            last_access: now,
            accessed: true,
        }
    }
}

/// 一次置换的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eviction {
    /// 被换出页的虚拟页号
    pub vpn: Vpn,
    /// 被复用的帧号
    pub frame: FrameNumber,
    /// 换出时的 age 位串
    pub age: u16,
}

/// 置换状态：驻留页集合、逻辑时钟与老化计数
#[derive(Debug, Clone)]
pub struct AgingState {
    /// 最大帧数，`None` 表示不限
    max_frames: Option<NonZeroU32>,
    /// 老化周期（访问次数）
    interval: NonZeroU32,
    accesses_since_aging: u32,
    /// 逻辑时钟
    clock: u64,
    /// 下一个未使用的帧号
    next_free_frame: FrameNumber,
    resident: Vec<ResidentPage>,
}

impl AgingState {
    pub fn new(max_frames: Option<NonZeroU32>, interval: NonZeroU32) -> Self {
        Self {
            max_frames,
            interval,
            accesses_since_aging: 0,
            clock: 0,
            next_free_frame: 0,
            resident: Vec::new(),
        }
    }

    pub fn max_frames(&self) -> Option<NonZeroU32> {
        self.max_frames
    }

    pub fn interval(&self) -> NonZeroU32 {
        self.interval
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn resident(&self) -> &[ResidentPage] {
        &self.resident
    }

    /// 已分配的帧总数
    pub fn frames_allocated(&self) -> FrameNumber {
        self.next_free_frame
    }

    /// 时钟前进一步，到达老化周期时执行一次老化
    pub fn tick(&mut self) {
        self.clock += 1;
        self.accesses_since_aging += 1;

        if self.accesses_since_aging >= self.interval.get() {
            self.age_all();
            self.accesses_since_aging = 0;
        }
    }

    /// 所有驻留页的 age 右移一位，本周期访问过的页最高位置 1
    pub fn age_all(&mut self) {
        for page in &mut self.resident {
            page.age >>= 1;
            if page.accessed {
                page.age |= AGE_MSB;
            }
            page.accessed = false;
        }
        log::trace!("Aged {} resident pages at t={}", self.resident.len(), self.clock);
    }

    pub fn find(&self, vpn: Vpn) -> Option<usize> {
        self.resident.iter().position(|page| page.vpn == vpn)
    }

    /// 记录一次访问，返回是否找到对应的驻留页
    pub fn note_access(&mut self, vpn: Vpn, frame: FrameNumber) -> bool {
        let now = self.clock;
        match self
            .resident
            .iter_mut()
            .find(|page| page.vpn == vpn && page.frame == frame)
        {
            Some(page) => {
                page.last_access = now;
                page.accessed = true;
                true
            }
            None => false,
        }
    }

    /// 是否还有未使用的帧
    pub fn has_free_frame(&self) -> bool {
        match self.max_frames {
            Some(max) => self.resident.len() < max.get() as usize,
            None => true,
        }
    }

    /// 为 `vpn` 分配下一个未使用的帧并追加驻留记录
    pub fn allocate(&mut self, vpn: Vpn) -> FrameNumber {
        debug_assert!(self.has_free_frame(), "frame budget exhausted");

        let frame = self.next_free_frame;
        self.next_free_frame += 1;
        self.resident.push(ResidentPage::fresh(vpn, frame, self.clock));
        frame
    }

    /// 选择牺牲页：age 最小，其次最后访问时间最早，其次存储顺序最靠前
    pub fn choose_victim(&self) -> Option<usize> {
        debug_assert!(!self.resident.is_empty(), "victim scan over empty resident set");

        self.resident
            .iter()
            .enumerate()
            .min_by_key(|(_, page)| (page.age, page.last_access))
            .map(|(index, _)| index)
    }

    /// 用 `vpn` 覆盖第 `index` 条驻留记录，帧号保持不变
    ///
    /// 返回被换出页的信息（age 为覆盖前的值）。
    pub fn replace(&mut self, index: usize, vpn: Vpn) -> Eviction {
        let now = self.clock;
        let page = &mut self.resident[index];
        let eviction = Eviction {
            vpn: page.vpn,
            frame: page.frame,
            age: page.age,
        };
        *page = ResidentPage::fresh(vpn, page.frame, now);
        eviction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max_frames: Option<u32>, interval: u32) -> AgingState {
        AgingState::new(
            max_frames.and_then(NonZeroU32::new),
            NonZeroU32::new(interval).unwrap(),
        )
    }

    #[test]
    fn test_allocate_assigns_sequential_frames() {
        let mut rs = state(None, 10);

        assert_eq!(rs.allocate(0x10), 0);
        assert_eq!(rs.allocate(0x20), 1);
        assert_eq!(rs.frames_allocated(), 2);
        assert_eq!(rs.resident()[1].age, AGE_MSB);
        assert_eq!(rs.find(0x20), Some(1));
        assert_eq!(rs.find(0x30), None);
    }

    #[test]
    fn test_budget() {
        let mut rs = state(Some(2), 10);
        assert!(rs.has_free_frame());
        rs.allocate(1);
        rs.allocate(2);
        assert!(!rs.has_free_frame());

        let unbounded = state(None, 10);
        assert!(unbounded.has_free_frame());
    }

    #[test]
    fn test_aging_fires_every_interval() {
        let mut rs = state(None, 3);
        rs.tick();
        rs.allocate(1);

        // 第 2、3 次访问后才到周期
        rs.tick();
        assert_eq!(rs.resident()[0].age, AGE_MSB);
        rs.tick();
        // 新页在本周期内被访问过：右移后最高位重新置 1
        assert_eq!(rs.resident()[0].age, 0xC000);
        assert!(!rs.resident()[0].accessed);

        // 一整个周期无访问：只右移
        rs.tick();
        rs.tick();
        rs.tick();
        assert_eq!(rs.resident()[0].age, 0x6000);
    }

    #[test]
    fn test_note_access_sets_flag_and_time() {
        let mut rs = state(None, 100);
        rs.tick();
        rs.allocate(7);
        rs.age_all();
        rs.tick();
        rs.tick();

        assert!(rs.note_access(7, 0));
        assert_eq!(rs.resident()[0].last_access, 3);
        assert!(rs.resident()[0].accessed);
        // 帧号不匹配时不记录
        assert!(!rs.note_access(7, 1));
    }

    #[test]
    fn test_victim_lowest_age() {
        let mut rs = state(Some(3), 100);
        rs.allocate(1);
        rs.allocate(2);
        rs.allocate(3);
        rs.resident[0].age = 0x4000;
        rs.resident[1].age = 0x2000;
        rs.resident[2].age = 0x8000;

        assert_eq!(rs.choose_victim(), Some(1));
    }

    #[test]
    fn test_victim_tie_broken_by_last_access() {
        let mut rs = state(Some(3), 100);
        rs.allocate(1);
        rs.allocate(2);
        rs.allocate(3);
        for page in &mut rs.resident {
            page.age = 0x1000;
        }
        rs.resident[0].last_access = 9;
        rs.resident[1].last_access = 4;
        rs.resident[2].last_access = 6;

        assert_eq!(rs.choose_victim(), Some(1));
    }

    #[test]
    fn test_victim_full_tie_picks_first() {
        let mut rs = state(Some(3), 100);
        rs.allocate(1);
        rs.allocate(2);
        rs.allocate(3);
        rs.resident[0].age = 0x8000;

        // 记录 1 和 2 完全相同的 age / 时间
        rs.resident[1].age = 0;
        rs.resident[2].age = 0;
        assert_eq!(rs.choose_victim(), Some(1));
    }

    #[test]
    fn test_replace_reuses_slot_and_frame() {
        let mut rs = state(Some(2), 100);
        rs.allocate(0xA);
        rs.allocate(0xB);
        rs.resident[0].age = 0x0100;
        rs.tick();

        let eviction = rs.replace(0, 0xC);

        assert_eq!(
            eviction,
            Eviction {
                vpn: 0xA,
                frame: 0,
                age: 0x0100
            }
        );
        assert_eq!(rs.resident()[0].vpn, 0xC);
        assert_eq!(rs.resident()[0].frame, 0);
        assert_eq!(rs.resident()[0].age, AGE_MSB);
        assert_eq!(rs.resident()[0].last_access, 1);
        assert_eq!(rs.frames_allocated(), 2);
    }
}
