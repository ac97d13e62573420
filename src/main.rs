//! EcoCore - Page sustainability toolkit
//!
//! Runs the optimizers against a local HTML file and prints the report.

use ecocore::host::parse_entries;
use ecocore::{Capabilities, EcoCore, NAME, Page, PageReport, VERSION};
use std::env;
use std::fs;

struct ReportArgs {
    page: String,
    resources: Option<String>,
    options: Option<String>,
    json: bool,
}

fn usage() {
    println!("Usage: ecocore report <page.html> [--resources <entries.json>] [--options <options.json>] [--json]");
    println!("       ecocore --version");
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--version") => println!("{} v{}", NAME, VERSION),
        Some("report") => {
            let Some(report_args) = parse_report_args(&args[2..]) else {
                usage();
                std::process::exit(2);
            };
            if let Err(e) = run_report(report_args).await {
                eprintln!("❌ Report failed: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            usage();
            std::process::exit(2);
        }
    }
}

fn parse_report_args(args: &[String]) -> Option<ReportArgs> {
    let mut page = None;
    let mut resources = None;
    let mut options = None;
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--resources" => resources = Some(iter.next()?.clone()),
            "--options" => options = Some(iter.next()?.clone()),
            "--json" => json = true,
            flag if flag.starts_with("--") => return None,
            path if page.is_none() => page = Some(path.to_string()),
            _ => return None,
        }
    }

    Some(ReportArgs {
        page: page?,
        resources,
        options,
        json,
    })
}

async fn run_report(args: ReportArgs) -> ecocore::Result<()> {
    let html = fs::read_to_string(&args.page)?;
    let page = Page::from_html(&html, Capabilities::modern())?;

    if let Some(path) = &args.resources {
        let entries = parse_entries(&fs::read_to_string(path)?)?;
        log::debug!("loaded {} resource entries from {}", entries.len(), path);
        for entry in entries {
            page.record_resource(entry);
        }
    }

    let options = match &args.options {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => serde_json::Value::Null,
    };

    let mut core = EcoCore::init_with_options(page.clone(), options)?;
    page.dispatch_dom_content_loaded();
    let webp = core.image_optimizer().format_support().await;
    let report = core.report();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args.page, &report, webp);
    }
    Ok(())
}

fn print_report(path: &str, report: &PageReport, webp: Option<bool>) {
    let footprint = report.footprint();

    println!("🌱 {} v{} - {}", NAME, VERSION, path);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Footprint:");
    println!("   • Page weight: {}", footprint.page_weight);
    println!("   • Requests: {}", footprint.requests);
    println!("   • DOM nodes: {}", footprint.dom_nodes);
    println!("   • Estimated CO2: {}", footprint.estimated_co2);
    println!("🏅 Score: {}/100 ({})", report.score(), report.grade());
    let breakdown = report.breakdown();
    println!(
        "   • Penalties: weight -{}, requests -{}, DOM -{}",
        breakdown.page_weight_penalty, breakdown.request_penalty, breakdown.dom_penalty
    );
    if let Some(true) = webp {
        println!("🖼️  WebP decoding available");
    }
    println!("💡 Tips:");
    for tip in report.tips() {
        println!("   • {}", tip);
    }
}
