//! CLI argument definition and parsing.

use std::env;
use std::net::IpAddr;
use std::process;

use owo_colors::OwoColorize;

/// Which export files to write after validation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
    Both,
}

#[derive(Clone, Debug)]
pub struct Args {
    /// Target domain to validate.
    pub domain: String,
    /// Recursive resolvers given with `@`; `None` means the built-in defaults.
    pub nameservers: Option<Vec<IpAddr>>,
    /// Print the JSON document instead of the coloured report.
    pub json: bool,
    /// Query authoritative nameservers and compare their DNSKEY sets.
    pub check_consistency: bool,
    /// Write export file(s) after validation.
    pub export: Option<ExportFormat>,
}

const USAGE: &str = "\
usage: dnsvet <domain> [@resolver[,resolver...]] [+flags]

flags:
    +json               print the JSON document instead of the report
    +no-consistency     skip the authoritative-nameserver consistency check
    +export[=FORMAT]    write exports/<domain>_<timestamp> files;
                        FORMAT is json, text or both (default: both)
    +help               show this help

examples:
    dnsvet cloudflare.com
    dnsvet example.org @9.9.9.9
    dnsvet example.org @8.8.8.8,1.1.1.1 +json
";

impl Args {
    pub fn parse() -> Self {
        // skip executable name
        let args: Vec<String> = env::args().skip(1).collect();

        let mut domain = None;
        let mut nameservers = None;
        let mut json = false;
        let mut check_consistency = true;
        let mut export = None;

        for arg in args {
            if let Some(ns) = arg.strip_prefix('@') {
                // resolver list
                let parsed: Result<Vec<IpAddr>, _> = ns
                    .split(',')
                    .filter(|part| !part.is_empty())
                    .map(|part| part.trim().parse::<IpAddr>())
                    .collect();
                match parsed {
                    Ok(ips) if !ips.is_empty() => nameservers = Some(ips),
                    _ => err(format!("Invalid resolver list: {}.", ns)),
                }
            } else if let Some(flag) = arg.strip_prefix('+') {
                match flag {
                    "json" => {
                        json = true;
                    }
                    "no-consistency" => {
                        check_consistency = false;
                    }
                    "export" | "export=both" => {
                        export = Some(ExportFormat::Both);
                    }
                    "export=json" => {
                        export = Some(ExportFormat::Json);
                    }
                    "export=text" => {
                        export = Some(ExportFormat::Text);
                    }
                    "help" => {
                        println!("{}", USAGE);
                        process::exit(0);
                    }
                    _ => err(format!("Unknown flag: +{}.", flag)),
                }
            } else if arg == "-h" || arg == "--help" {
                println!("{}", USAGE);
                process::exit(0);
            } else if domain.is_none() {
                domain = Some(arg);
            } else {
                err(format!("Unexpected argument: {}.", arg));
            }
        }

        let domain = match domain {
            Some(domain) => domain,
            None => {
                println!("{}", USAGE);
                process::exit(1);
            }
        };

        Self {
            domain,
            nameservers,
            json,
            check_consistency,
            export,
        }
    }
}

fn err(msg: String) -> ! {
    eprintln!(
        "{}",
        msg.if_supports_color(owo_colors::Stream::Stderr, |s| s.red())
    );
    process::exit(1);
}
