/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bpaf::Bpaf;
use dashshell::config::DashboardConfig;
use dashshell::persistence::{ItemsRepository, RedbKeyValueStore};
use dashshell::{DashboardApp, DashboardIntent};
use dashshell_core::{Hierarchy, ROOT_ID, SortDirection, SortOption, SortSpec};
use tracing_subscriber::EnvFilter;

/// Inspect a dashboard data directory.
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
struct Cli {
    /// Configuration file (TOML)
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    /// Data directory holding dashboard.redb
    #[bpaf(long("data-dir"), argument("DIR"))]
    data_dir: Option<PathBuf>,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Debug, Clone, Bpaf)]
enum Command {
    /// Print the content tree with item counts
    #[bpaf(command)]
    Tree,
    /// Resolve one view and list its sorted children
    #[bpaf(command)]
    View {
        /// Sort key: manual, name, type, createdAt, updatedAt, rating, itemCount, ...
        #[bpaf(long, argument("OPTION"))]
        sort: Option<String>,
        /// Sort descending
        desc: bool,
        /// View id
        #[bpaf(positional("ID"), fallback(ROOT_ID.to_string()))]
        id: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli().run();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("dashshell: {message}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config_path = cli.config.or_else(DashboardConfig::default_path);
    let mut config = match &config_path {
        Some(path) => DashboardConfig::load(path).map_err(|e| e.to_string())?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }
    let data_dir = config
        .storage
        .resolved_data_dir()
        .ok_or_else(|| "no data directory; pass --data-dir".to_string())?;

    let backend = RedbKeyValueStore::open(&data_dir).map_err(|e| e.to_string())?;
    let repository = ItemsRepository::new(Arc::new(backend), config.storage.items_key.clone());
    let mut app = DashboardApp::open(config, repository).map_err(|e| e.to_string())?;

    match cli.command {
        Command::Tree => {
            let hierarchy = app.hierarchy();
            print_subtree(&app, &hierarchy, ROOT_ID, 0);
            for id in hierarchy.detached() {
                print_subtree(&app, &hierarchy, id, 0);
            }
        },
        Command::View { sort, desc, id } => {
            let option = match sort.as_deref() {
                Some(raw) => {
                    SortOption::parse(raw).ok_or_else(|| format!("unknown sort option: {raw}"))?
                },
                None => SortOption::Manual,
            };
            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            app.apply_intents([DashboardIntent::Navigate { view_id: id.clone() }]);
            if app.active_view_id() != id {
                return Err(format!("view not found: {id}"));
            }
            let spec = SortSpec::new(option, direction);
            let view = app
                .resolve_active_view_sorted(spec)
                .ok_or_else(|| format!("view not found: {id}"))?;
            println!("{} ({})", view.node.title, view.id());
            for child in &view.sorted_children {
                println!("  {:<12} {}  [{}]", child.kind.as_str(), child.title, child.id);
            }
        },
    }
    Ok(())
}

fn print_subtree(app: &DashboardApp, hierarchy: &Hierarchy, id: &str, depth: usize) {
    let Some(node) = app.store().get(id) else {
        return;
    };
    let count = hierarchy.item_count(id);
    if node.is_container() {
        println!("{:indent$}{} ({count})", "", node.title, indent = depth * 2);
    } else {
        println!("{:indent$}{}", "", node.title, indent = depth * 2);
    }
    for child in hierarchy.children(id) {
        print_subtree(app, hierarchy, child, depth + 1);
    }
}
