//! 命令行参数
//!
//! 配置的优先级：默认值 < `--config` 文件 < 命令行参数。

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum, value_parser};
use vm_mem::{ConfigError, SimConfig};

/// 输出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogMode {
    /// 运行结束后输出汇总
    #[value(name = "summary")]
    Summary,
    /// 输出每级掩码后退出
    #[value(name = "bitmasks")]
    Bitmasks,
    /// 虚拟地址 -> 物理地址
    #[value(name = "va2pa")]
    Va2Pa,
    /// 页内偏移
    #[value(name = "offset")]
    Offset,
    /// 虚拟页号 -> 帧号，含命中信息
    #[value(name = "vpn2pfn")]
    Vpn2Pfn,
    /// 虚拟页号 -> 帧号，含命中与置换信息
    #[value(name = "vpn2pfn_pr")]
    Vpn2PfnPr,
    /// 每级索引 -> 帧号
    #[value(name = "vpns_pfn")]
    VpnsPfn,
    /// JSON 格式的汇总
    #[value(name = "json")]
    Json,
}

/// 解析后的命令行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub trace_file: PathBuf,
    pub level_bits: Vec<u32>,
    /// 最多处理的地址数
    pub limit: Option<u64>,
    pub max_frames: Option<u32>,
    pub aging_interval: Option<u32>,
    pub log_mode: LogMode,
    pub config: Option<PathBuf>,
}

fn parse_access_limit(value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(limit) if limit >= 1 => Ok(limit),
        _ => Err("Number of memory accesses must be a number and greater than 0".to_string()),
    }
}

fn parse_frame_count(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(frames) if frames >= 1 => Ok(frames),
        _ => Err(ConfigError::ZeroFrames.to_string()),
    }
}

fn parse_aging_interval(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(interval) if interval >= 1 => Ok(interval),
        _ => Err(ConfigError::ZeroInterval.to_string()),
    }
}

/// 非数字的位宽按 0 处理，交给 [`SimConfig::validate`] 报告具体是哪一级
fn parse_level_width(value: &str) -> Result<u32, String> {
    Ok(value.parse::<u32>().unwrap_or(0))
}

pub fn command() -> Command {
    Command::new("pagingwithage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Simulate multi-level page table translation with aging page replacement")
        .arg(
            Arg::new("accesses")
                .short('n')
                .value_name("N")
                .help("Process only the first N memory accesses")
                .value_parser(parse_access_limit),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .value_name("N")
                .help("Number of available physical frames [default: unbounded]")
                .value_parser(parse_frame_count),
        )
        .arg(
            Arg::new("interval")
                .short('b')
                .value_name("N")
                .help("Number of accesses between age bit string updates [default: 10]")
                .value_parser(parse_aging_interval),
        )
        .arg(
            Arg::new("log-mode")
                .short('l')
                .value_name("MODE")
                .help("Output mode")
                .value_parser(value_parser!(LogMode))
                .default_value("summary"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("trace-file")
                .value_name("TRACE_FILE")
                .help("Binary address trace file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("level-bits")
                .value_name("LEVEL_BITS")
                .help("Number of address bits used by each page table level")
                .num_args(0..)
                .action(ArgAction::Append)
                .value_parser(parse_level_width),
        )
}

impl CliArgs {
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            trace_file: matches
                .get_one::<PathBuf>("trace-file")
                .cloned()
                .unwrap_or_default(),
            level_bits: matches
                .get_many::<u32>("level-bits")
                .map(|bits| bits.copied().collect())
                .unwrap_or_default(),
            limit: matches.get_one::<u64>("accesses").copied(),
            max_frames: matches.get_one::<u32>("frames").copied(),
            aging_interval: matches.get_one::<u32>("interval").copied(),
            log_mode: matches
                .get_one::<LogMode>("log-mode")
                .copied()
                .unwrap_or(LogMode::Summary),
            config: matches.get_one::<PathBuf>("config").cloned(),
        }
    }

    /// 合并配置文件与命令行参数，并在模拟开始前校验
    pub fn sim_config(&self) -> Result<SimConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)?,
            None => SimConfig::default(),
        };

        if !self.level_bits.is_empty() {
            config.level_bits = self.level_bits.clone();
        }
        if let Some(frames) = self.max_frames {
            config.max_frames = Some(frames);
        }
        if let Some(interval) = self.aging_interval {
            config.aging_interval = interval;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("pagingwithage").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["trace.tr", "4", "8", "8"]);

        assert_eq!(args.trace_file, PathBuf::from("trace.tr"));
        assert_eq!(args.level_bits, vec![4, 8, 8]);
        assert_eq!(args.limit, None);
        assert_eq!(args.max_frames, None);
        assert_eq!(args.log_mode, LogMode::Summary);

        let config = args.sim_config().unwrap();
        assert_eq!(config.aging_interval, 10);
        assert_eq!(config.max_frames, None);
    }

    #[test]
    fn test_all_options() {
        let args = parse(&["-n", "50", "-f", "20", "-b", "5", "-l", "vpn2pfn_pr", "trace.tr", "16", "4"]);

        assert_eq!(args.limit, Some(50));
        assert_eq!(args.max_frames, Some(20));
        assert_eq!(args.aging_interval, Some(5));
        assert_eq!(args.log_mode, LogMode::Vpn2PfnPr);
        assert_eq!(args.level_bits, vec![16, 4]);
    }

    #[test]
    fn test_log_mode_names() {
        for (name, mode) in [
            ("bitmasks", LogMode::Bitmasks),
            ("va2pa", LogMode::Va2Pa),
            ("offset", LogMode::Offset),
            ("vpn2pfn", LogMode::Vpn2Pfn),
            ("vpns_pfn", LogMode::VpnsPfn),
            ("json", LogMode::Json),
        ] {
            assert_eq!(parse(&["-l", name, "t", "8"]).log_mode, mode);
        }
    }

    #[test]
    fn test_rejects_zero_access_limit() {
        let err = CliArgs::try_parse_from(["pagingwithage", "-n", "0", "t", "8"]).unwrap_err();

        assert!(
            err.to_string()
                .contains("Number of memory accesses must be a number and greater than 0")
        );
    }

    #[test]
    fn test_rejects_unknown_mode_and_missing_trace() {
        assert!(CliArgs::try_parse_from(["pagingwithage", "-l", "verbose", "t", "8"]).is_err());
        assert!(CliArgs::try_parse_from(["pagingwithage"]).is_err());
    }

    #[test]
    fn test_invalid_levels_rejected_by_config() {
        let args = parse(&["t", "8", "0"]);
        assert_eq!(args.sim_config(), Err(ConfigError::ZeroLevelBits { level: 1 }));

        let args = parse(&["t"]);
        assert_eq!(args.sim_config(), Err(ConfigError::NoLevels));

        let args = parse(&["t", "8", "abc"]);
        assert_eq!(args.level_bits, vec![8, 0]);
        assert_eq!(args.sim_config(), Err(ConfigError::ZeroLevelBits { level: 1 }));
    }

    #[test]
    fn test_rejects_bad_frame_count_and_interval() {
        for value in ["0", "abc"] {
            let err = CliArgs::try_parse_from(["pagingwithage", "-f", value, "t", "8"]).unwrap_err();
            assert!(
                err.to_string()
                    .contains("Number of available frames must be a number and greater than 0"),
                "-f {value}: {err}"
            );

            let err = CliArgs::try_parse_from(["pagingwithage", "-b", value, "t", "8"]).unwrap_err();
            assert!(
                err.to_string()
                    .contains("Bit string update interval must be a number and greater than 0"),
                "-b {value}: {err}"
            );
        }
    }

    #[test]
    fn test_command_line_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "level-bits = [4, 8, 8]").unwrap();
        writeln!(file, "max-frames = 8").unwrap();
        writeln!(file, "aging-interval = 3").unwrap();
        let path = file.path().to_str().unwrap();

        let from_file = parse(&["--config", path, "t"]).sim_config().unwrap();
        assert_eq!(from_file.level_bits, vec![4, 8, 8]);
        assert_eq!(from_file.max_frames, Some(8));
        assert_eq!(from_file.aging_interval, 3);

        let overridden = parse(&["--config", path, "-f", "2", "t", "10", "10"])
            .sim_config()
            .unwrap();
        assert_eq!(overridden.level_bits, vec![10, 10]);
        assert_eq!(overridden.max_frames, Some(2));
        assert_eq!(overridden.aging_interval, 3);
    }
}
