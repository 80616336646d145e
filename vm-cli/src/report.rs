//! 输出格式
//!
//! 把模拟器产生的访问事件和汇总渲染为各输出模式的文本。

use std::io::{self, Write};

use vm_mem::{AccessEvent, AddressLayout, Summary};

use crate::args::LogMode;

pub struct Reporter<W: Write> {
    mode: LogMode,
    layout: AddressLayout,
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(mode: LogMode, layout: AddressLayout, out: W) -> Self {
        Self { mode, layout, out }
    }

    /// 每级掩码
    pub fn bitmasks(&mut self) -> io::Result<()> {
        writeln!(self.out, "Bitmasks")?;
        for (level, mask) in self.layout.masks().iter().enumerate() {
            writeln!(self.out, "level {} mask {:08X}", level, mask)?;
        }
        Ok(())
    }

    /// 单次访问，只在逐地址输出的模式下产生输出
    pub fn record(&mut self, event: &AccessEvent) -> io::Result<()> {
        match self.mode {
            LogMode::Va2Pa => writeln!(
                self.out,
                "{:08X} -> {:08X}",
                event.virtual_address, event.physical_address
            ),
            LogMode::Offset => writeln!(self.out, "{:08X}", event.offset),
            LogMode::Vpn2Pfn => {
                self.write_vpn2pfn(event)?;
                writeln!(self.out)
            }
            LogMode::Vpn2PfnPr => {
                self.write_vpn2pfn(event)?;
                if let Some(eviction) = event.eviction {
                    write!(
                        self.out,
                        ", {:X} page was replaced, bitstring {:04X}",
                        eviction.vpn, eviction.age
                    )?;
                }
                writeln!(self.out)
            }
            LogMode::VpnsPfn => {
                for index in self.layout.level_indices(event.virtual_address) {
                    write!(self.out, "{:X} ", index)?;
                }
                writeln!(self.out, "-> {:X}", event.frame)
            }
            LogMode::Summary | LogMode::Bitmasks | LogMode::Json => Ok(()),
        }
    }

    fn write_vpn2pfn(&mut self, event: &AccessEvent) -> io::Result<()> {
        write!(
            self.out,
            "{:X} -> {:X}, {}",
            event.vpn,
            event.frame,
            if event.hit { "pagetable hit" } else { "pagetable miss" }
        )
    }

    /// 运行结束，只在汇总模式下产生输出
    pub fn finish(&mut self, summary: &Summary) -> io::Result<()> {
        match self.mode {
            LogMode::Summary => {
                writeln!(self.out, "Page size: {} bytes", summary.page_size)?;
                writeln!(self.out, "Addresses processed: {}", summary.addresses)?;
                writeln!(
                    self.out,
                    "Page hits: {}, Misses: {}, Page Replacements: {}",
                    summary.hits, summary.misses, summary.evictions
                )?;
                writeln!(
                    self.out,
                    "Page hit percentage: {:.2}%, miss percentage: {:.2}%",
                    summary.hit_rate(),
                    summary.miss_rate()
                )?;
                writeln!(self.out, "Frames allocated: {}", summary.frames_allocated)?;
                writeln!(
                    self.out,
                    "Number of page table entries: {}",
                    summary.page_table_entries
                )
            }
            LogMode::Json => {
                serde_json::to_writer_pretty(&mut self.out, summary)?;
                writeln!(self.out)
            }
            _ => Ok(()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
