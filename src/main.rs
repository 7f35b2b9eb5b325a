//! Bootstraps a propkeeper store.
//!
//! Loads settings (an optional config file path may be given as the only
//! argument), opens the database, makes sure the configured tag domain keys
//! exist and prints a short JSON report of what the store holds.

use propkeeper::construct::{Property, PropertyGroup};
use propkeeper::database::Database;
use propkeeper::error::Result;
use propkeeper::filter::Pagination;
use propkeeper::interface::FilterRequest;
use propkeeper::settings::Settings;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let config_file = std::env::args().nth(1);
    let settings = match Settings::load(config_file.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&settings) {
        error!(error = %e, "bootstrap failed");
        std::process::exit(1);
    }
}

fn run(settings: &Settings) -> Result<()> {
    let db = Database::open(&settings.database)?;
    for key in &settings.tag_domain {
        db.protect_tag_domain_key(key)?;
    }
    let domain = db.tag_domain()?;
    // a single row is enough, only the totals are reported
    let page = Pagination::new(0, 1)?;
    let groups = db.filter_property_groups(&FilterRequest::<PropertyGroup>::new(
        Default::default(),
        page,
    ))?;
    let properties =
        db.filter_properties(&FilterRequest::<Property>::new(Default::default(), page))?;
    info!(
        mode = ?settings.database.persistence_mode(),
        keys = domain.len(),
        groups = groups.total_results,
        properties = properties.total_results,
        "store ready"
    );
    let report = json!({
        "tagDomain": domain,
        "propertyGroups": groups.total_results,
        "properties": properties.total_results,
        "defaultPageSize": settings.default_page_size,
    });
    println!("{report:#}");
    Ok(())
}
