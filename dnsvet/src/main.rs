use std::cmp::max;

use anyhow::Result;
use owo_colors::{OwoColorize, Style};

use dnsvet::chain::{TrustChain, ValidationStatus};
use dnsvet::export;
use dnsvet::resolver::{Resolver, ResolverConfig};
use dnsvet::validator::Validator;

mod args;

use args::{Args, ExportFormat};

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ResolverConfig::default();
    if let Some(nameservers) = args.nameservers.clone() {
        config = config.with_nameservers(nameservers);
    }

    let validator = Validator::new(Resolver::new(config));
    let chain = validator.validate_chain_with(&args.domain, args.check_consistency);

    if args.json {
        println!("{}", export::export_json(&chain, None)?);
    } else {
        display_chain(&chain);
    }

    if let Some(format) = args.export {
        let base = export::export_base_path(&chain);
        let mut exported = Vec::new();

        if matches!(format, ExportFormat::Json | ExportFormat::Both) {
            let path = base.with_extension("json");
            export::export_json(&chain, Some(&path))?;
            exported.push(path);
        }
        if matches!(format, ExportFormat::Text | ExportFormat::Both) {
            let path = base.with_extension("txt");
            export::export_text(&chain, Some(&path))?;
            exported.push(path);
        }

        let paths: Vec<_> = exported.iter().map(|p| p.display().to_string()).collect();
        eprintln!("Exported: {}", paths.join(", "));
    }

    Ok(())
}

fn status_style(status: ValidationStatus) -> Style {
    match status {
        ValidationStatus::Secure => Style::new().green(),
        ValidationStatus::Insecure => Style::new().yellow(),
        ValidationStatus::Bogus => Style::new().red(),
        ValidationStatus::Indeterminate => Style::new().magenta(),
        ValidationStatus::Unknown => Style::new().dimmed(),
    }
}

fn display_chain(chain: &TrustChain) {
    let output = owo_colors::Stream::Stdout;
    let headline_style = Style::new().bold();

    println!(
        "{}",
        format!("DNSSEC chain of trust for {}", chain.target_domain)
            .if_supports_color(output, |text| text.style(headline_style))
    );
    println!();

    let mut max_name_len = 0;
    for zone in &chain.zones {
        max_name_len = max(max_name_len, zone.name.len());
    }

    for zone in &chain.zones {
        let style = status_style(zone.status);
        let status = format!("{} {}", export::status_symbol(zone.status), zone.status);

        println!(
            "  {}  {:name_width$}  {}",
            status.if_supports_color(output, |s| s.style(style)),
            zone.name,
            zone.status_reason,
            name_width = max_name_len,
        );

        let mut details = Vec::new();
        if zone.has_dnssec() {
            details.push(format!(
                "{} DNSKEYs ({} KSK, {} ZSK)",
                zone.dnskeys.len(),
                zone.ksk_count(),
                zone.zsk_count()
            ));
        }
        if !zone.ds_records.is_empty() {
            details.push(format!("{} DS", zone.ds_records.len()));
        }
        if !zone.rrsigs.is_empty() {
            details.push(format!("{} RRSIG", zone.rrsigs.len()));
        }
        if let Some(consistency) = &zone.consistency {
            details.push(format!("consistency: {}", consistency.summary()));
        }
        if !details.is_empty() {
            println!(
                "           {}",
                details
                    .join(", ")
                    .if_supports_color(output, |s| s.dimmed())
            );
        }

        if let Some(consistency) = &zone.consistency {
            for issue in &consistency.issues {
                println!(
                    "           {}",
                    format!("! {}", issue).if_supports_color(output, |s| s.yellow())
                );
            }
        }
    }

    if let Some(target) = chain.target_zone() {
        if !target.additional_records.is_empty() {
            println!();
            println!(
                "{}",
                "Records at the target:".if_supports_color(output, |s| s.style(headline_style))
            );
            for record in &target.additional_records {
                let signed = if record.is_signed { "✓" } else { " " };
                println!("  {} {:6} {}", signed, record.record_type, record.value);
            }
        }
    }

    println!();
    let overall_style = status_style(chain.overall_status).bold();
    println!(
        "{} {}",
        format!(
            "{} {}:",
            export::status_symbol(chain.overall_status),
            chain.overall_status
        )
        .if_supports_color(output, |s| s.style(overall_style)),
        chain.overall_reason
    );
    println!(
        "{}",
        format!(
            "via {} in {:.0} ms",
            chain.resolver_used, chain.query_duration_ms
        )
        .if_supports_color(output, |s| s.dimmed())
    );
}
