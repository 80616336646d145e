//! pagingwithage: 多级页表 + Aging 页面置换模拟器
//!
//! ```text
//! pagingwithage [-n N] [-f N] [-b N] [-l MODE] [--config FILE] TRACE_FILE [LEVEL_BITS...]
//! ```

mod args;
mod report;

use std::io::{self, BufWriter};
use std::process;

use anyhow::{Context, Result};
use log::info;
use vm_mem::Simulator;
use vm_trace::TraceReader;

use crate::args::{CliArgs, LogMode};
use crate::report::Reporter;

fn run(args: &CliArgs) -> Result<()> {
    let config = args.sim_config()?;
    let mut simulator = Simulator::new(&config)?;

    let stdout = io::stdout().lock();
    let mut reporter = Reporter::new(args.log_mode, simulator.layout().clone(), BufWriter::new(stdout));

    let trace = TraceReader::open(&args.trace_file)?;
    if args.log_mode == LogMode::Bitmasks {
        reporter.bitmasks()?;
        reporter.flush()?;
        return Ok(());
    }
    info!("Reading trace {}", args.trace_file.display());

    let addresses = trace.map(|record| record.map(|r| r.address).map_err(anyhow::Error::from));
    simulator
        .run(addresses, args.limit, |event| {
            reporter.record(event).context("Failed to write output")
        })
        .with_context(|| format!("Simulation of {} aborted", args.trace_file.display()))?;

    reporter.finish(&simulator.summary())?;
    reporter.flush()?;
    Ok(())
}

fn main() {
    // 日志输出到 stderr，不影响 stdout 上的报告格式
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // 用法错误与配置错误一样以状态码 1 退出；--help/--version 仍走 clap 的默认处理
    let args = match CliArgs::try_parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(1);
        }
        Err(e) => e.exit(),
    };
    if let Err(e) = run(&args) {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}
