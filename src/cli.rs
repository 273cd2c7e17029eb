use clap::{Parser, ValueEnum};
use std::fmt;

/// WETH contract, used when no address is given.
pub const DEFAULT_ADDRESS: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnalysisMode {
    Beneficiary,
    Payer,
    Both,
}

impl AnalysisMode {
    pub fn includes_beneficiary(self) -> bool {
        matches!(self, AnalysisMode::Beneficiary | AnalysisMode::Both)
    }

    pub fn includes_payer(self) -> bool {
        matches!(self, AnalysisMode::Payer | AnalysisMode::Both)
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisMode::Beneficiary => "beneficiary",
            AnalysisMode::Payer => "payer",
            AnalysisMode::Both => "both",
        })
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "eth-fund-flow",
    about = "Ethereum fund flow analysis API (beneficiaries and payers of an address)",
    after_help = "Examples:\n  \
        eth-fund-flow --address 0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2 --mode beneficiary\n  \
        eth-fund-flow --address 0x7a250d5630b4cf539739df2c5dacb4c659f2488d --mode payer\n  \
        eth-fund-flow --port 9090\n\n\
        Long flags take two dashes; `-address=0x..` is not accepted, use `--address=0x..` \
        or `--address 0x..`."
)]
pub struct Cli {
    /// Ethereum address shown on the home and analyze-default pages.
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Analysis mode.
    #[arg(long, value_enum, default_value_t = AnalysisMode::Both)]
    pub mode: AnalysisMode,

    /// Port to run the server on (overrides PORT).
    #[arg(long)]
    pub port: Option<u16>,

    /// Emit request/response diagnostics at DEBUG level.
    #[arg(long, short, env = "FUND_FLOW_VERBOSE")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["eth-fund-flow"]).unwrap();
        assert_eq!(cli.address, DEFAULT_ADDRESS);
        assert_eq!(cli.mode, AnalysisMode::Both);
        assert_eq!(cli.port, None);
    }

    #[test]
    fn parses_mode_and_port() {
        let cli = Cli::try_parse_from(["eth-fund-flow", "--mode", "payer", "--port", "9090"])
            .unwrap();
        assert_eq!(cli.mode, AnalysisMode::Payer);
        assert_eq!(cli.port, Some(9090));
        assert!(cli.mode.includes_payer());
        assert!(!cli.mode.includes_beneficiary());
    }

    #[test]
    fn accepts_equals_form_and_rejects_single_dash_long_flags() {
        let cli = Cli::try_parse_from(["eth-fund-flow", "--address=0xabc", "--mode=payer"])
            .unwrap();
        assert_eq!(cli.address, "0xabc");
        assert_eq!(cli.mode, AnalysisMode::Payer);

        assert!(Cli::try_parse_from(["eth-fund-flow", "-address=0xabc"]).is_err());
    }

    #[test]
    fn help_explains_long_flag_syntax() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Long flags take two dashes"));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["eth-fund-flow", "--mode", "sideways"]).is_err());
    }
}
