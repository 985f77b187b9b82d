// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use clap::Parser;
use std::path::PathBuf;

/// 命令行参数
///
/// 输入CSV需要`Company`列，`Domain`列可选；
/// 运行级配置通过配置文件或`PROSPECTRS__*`环境变量提供
#[derive(Debug, Parser)]
#[command(name = "prospectrs", version, about = "Discover company domains and harvest contact emails")]
pub struct Cli {
    /// Input CSV file with a 'Company' column
    pub input_file: PathBuf,

    /// Output CSV file for results
    pub output_file: PathBuf,

    /// Number of concurrent workers (overrides configuration)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Only write rows for companies with at least one email
    #[arg(long)]
    pub emails_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_args() {
        let cli = Cli::parse_from(["prospectrs", "in.csv", "out.csv"]);
        assert_eq!(cli.input_file, PathBuf::from("in.csv"));
        assert_eq!(cli.output_file, PathBuf::from("out.csv"));
        assert_eq!(cli.workers, None);
        assert!(!cli.emails_only);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from([
            "prospectrs",
            "in.csv",
            "out.csv",
            "--workers",
            "8",
            "--emails-only",
            "-v",
        ]);
        assert_eq!(cli.workers, Some(8));
        assert!(cli.emails_only);
        assert!(cli.verbose);
    }
}
