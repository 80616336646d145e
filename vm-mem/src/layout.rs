//! 地址位切分
//!
//! 32 位虚拟地址从高位到低位依次切分为 N 个页表级索引，
//! 剩余的低位为页内偏移。

use crate::error::ConfigError;
use crate::{FrameNumber, PhysAddr, VirtAddr, Vpn};

/// 虚拟地址位宽
pub const ADDRESS_BITS: u32 = 32;

/// 每一级页表的位宽、掩码与移位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressLayout {
    /// 每级位宽（最高级在前）
    level_bits: Vec<u32>,
    /// 每级掩码
    masks: Vec<u32>,
    /// 每级右移位数
    shifts: Vec<u32>,
    /// 页内偏移位数
    offset_bits: u32,
    /// 页内偏移掩码
    offset_mask: u32,
}

/// 低 `bits` 位全 1 的掩码，`bits` 可以等于 32
fn low_mask(bits: u32) -> u32 {
    ((1u64 << bits) - 1) as u32
}

impl AddressLayout {
    /// 根据每级位宽构建地址布局
    ///
    /// 位宽必须都 >= 1，且总和不超过 [`ADDRESS_BITS`]。
    pub fn new(level_bits: &[u32]) -> Result<Self, ConfigError> {
        if level_bits.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        if let Some(level) = level_bits.iter().position(|&bits| bits == 0) {
            return Err(ConfigError::ZeroLevelBits { level });
        }
        // 用 u64 求和，避免恶意输入溢出
        let total: u64 = level_bits.iter().map(|&bits| u64::from(bits)).sum();
        if total > u64::from(ADDRESS_BITS) {
            return Err(ConfigError::TooManyBits {
                total: u32::try_from(total).unwrap_or(u32::MAX),
                max: ADDRESS_BITS,
            });
        }
        let total = total as u32;

        let mut masks = Vec::with_capacity(level_bits.len());
        let mut shifts = Vec::with_capacity(level_bits.len());
        let mut consumed = 0u32;
        for &bits in level_bits {
            consumed += bits;
            let shift = ADDRESS_BITS - consumed;
            masks.push((u64::from(low_mask(bits)) << shift) as u32);
            shifts.push(shift);
        }

        let offset_bits = ADDRESS_BITS - total;
        Ok(Self {
            level_bits: level_bits.to_vec(),
            masks,
            shifts,
            offset_bits,
            offset_mask: low_mask(offset_bits),
        })
    }

    pub fn level_count(&self) -> usize {
        self.level_bits.len()
    }

    pub fn level_bits(&self, level: usize) -> u32 {
        self.level_bits[level]
    }

    pub fn mask(&self, level: usize) -> u32 {
        self.masks[level]
    }

    pub fn shift(&self, level: usize) -> u32 {
        self.shifts[level]
    }

    pub fn masks(&self) -> &[u32] {
        &self.masks
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn offset_mask(&self) -> u32 {
        self.offset_mask
    }

    /// 页大小（字节）
    pub fn page_size(&self) -> u64 {
        1u64 << self.offset_bits
    }

    /// 某一级页表的条目数：2^位宽
    pub fn entry_count(&self, level: usize) -> usize {
        1usize << self.level_bits[level]
    }

    /// 提取某一级的索引
    pub fn level_index(&self, va: VirtAddr, level: usize) -> u32 {
        (va & self.masks[level]) >> self.shifts[level]
    }

    /// 提取所有级的索引（最高级在前）
    pub fn level_indices(&self, va: VirtAddr) -> Vec<u32> {
        (0..self.level_count())
            .map(|level| self.level_index(va, level))
            .collect()
    }

    /// 完整虚拟页号
    pub fn vpn(&self, va: VirtAddr) -> Vpn {
        va.checked_shr(self.offset_bits).unwrap_or(0)
    }

    pub fn offset(&self, va: VirtAddr) -> u32 {
        va & self.offset_mask
    }

    /// 虚拟页号对应的页起始地址（偏移为 0）
    pub fn vpn_to_address(&self, vpn: Vpn) -> VirtAddr {
        vpn.checked_shl(self.offset_bits).unwrap_or(0)
    }

    /// 由帧号和页内偏移拼出物理地址，超出 32 位的高位被截断
    pub fn physical_address(&self, frame: FrameNumber, offset: u32) -> PhysAddr {
        frame.checked_shl(self.offset_bits).unwrap_or(0) | (offset & self.offset_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_and_shifts_for_three_levels() {
        let layout = AddressLayout::new(&[4, 8, 8]).unwrap();

        assert_eq!(layout.masks(), &[0xF000_0000, 0x0FF0_0000, 0x000F_F000]);
        assert_eq!(layout.shift(0), 28);
        assert_eq!(layout.shift(1), 20);
        assert_eq!(layout.shift(2), 12);
        assert_eq!(layout.offset_bits(), 12);
        assert_eq!(layout.offset_mask(), 0xFFF);
        assert_eq!(layout.page_size(), 4096);
        assert_eq!(layout.entry_count(0), 16);
        assert_eq!(layout.entry_count(1), 256);
    }

    #[test]
    fn test_level_indices_and_vpn() {
        let layout = AddressLayout::new(&[4, 8, 8]).unwrap();
        let va = 0x1234_5678;

        assert_eq!(layout.level_indices(va), vec![0x1, 0x23, 0x45]);
        assert_eq!(layout.vpn(va), 0x12345);
        assert_eq!(layout.offset(va), 0x678);
        assert_eq!(layout.vpn_to_address(0x12345), 0x1234_5000);
        assert_eq!(layout.physical_address(3, 0x678), 0x3678);
    }

    #[test]
    fn test_full_width_level() {
        let layout = AddressLayout::new(&[32]).unwrap();

        assert_eq!(layout.mask(0), 0xFFFF_FFFF);
        assert_eq!(layout.shift(0), 0);
        assert_eq!(layout.offset_bits(), 0);
        assert_eq!(layout.offset_mask(), 0);
        assert_eq!(layout.page_size(), 1);
        assert_eq!(layout.level_index(0xDEAD_BEEF, 0), 0xDEAD_BEEF);
        assert_eq!(layout.vpn(0xDEAD_BEEF), 0xDEAD_BEEF);
        assert_eq!(layout.physical_address(7, 0), 7);
    }

    #[test]
    fn test_rejects_invalid_level_bits() {
        assert_eq!(AddressLayout::new(&[]), Err(ConfigError::NoLevels));
        assert_eq!(
            AddressLayout::new(&[8, 0, 4]),
            Err(ConfigError::ZeroLevelBits { level: 1 })
        );
        assert_eq!(
            AddressLayout::new(&[16, 16, 1]),
            Err(ConfigError::TooManyBits { total: 33, max: 32 })
        );
    }

    #[test]
    fn test_physical_address_truncates_high_frame_bits() {
        let layout = AddressLayout::new(&[20]).unwrap();

        assert_eq!(layout.physical_address(0x10_0001, 0xABC), 0x0000_1ABC);
    }
}
