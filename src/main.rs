use anyhow::Context;
use clap::Parser;
use depot_zoning::loader::{self, SessionInputs};
use depot_zoning::scheduler::PrewarmSources;
use depot_zoning::{cli, config, export, repl};
use cli::{Cli, Commands};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn inputs_for(cli: &Cli, config: &Config, source: Option<PathBuf>, town_source: Option<PathBuf>) -> anyhow::Result<SessionInputs> {
    let overrides = SessionInputs {
        zone_source: source,
        town_source,
        reference: cli.reference.clone(),
        in_scope: cli.in_scope.clone(),
    };
    Ok(SessionInputs::resolve(config, overrides, cli.data_dir.as_deref())?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match &cli.command {
        Commands::Inspect { source, zones } => {
            println!("🗺  depot-zoning - エリア確認\n");
            let inputs = inputs_for(&cli, &config, source.clone(), None)?;
            let session = loader::open_session(&config, &inputs).await?;
            let catalog = session.catalog();

            println!("✔ {}エリアを読み込み", catalog.len());
            if catalog.skipped_hidden() > 0 {
                println!("- 非表示地域: {}件", catalog.skipped_hidden());
            }
            println!("  地域: {}", session.regions().into_iter().collect::<Vec<_>>().join(", "));
            println!("  市区町村: {}", catalog.municipalities().len());

            let stats = session.stats();
            println!("  割当済み: {} / 未割当: {}", stats.assigned, stats.unassigned);
            for (depot, count) in &stats.by_depot {
                println!("  {}: {}", depot.display_name(), count);
            }

            if *zones {
                println!();
                for row in session.export_rows()? {
                    let scope = if session.is_in_scope(&row.zone_id) { "" } else { " (対象外)" };
                    println!(
                        "  {} [{}]{}",
                        session.tooltip_for(&row.zone_id),
                        row.depot_code_str(),
                        scope
                    );
                }
            }
        }

        Commands::Search { query, source } => {
            let inputs = inputs_for(&cli, &config, source.clone(), None)?;
            let session = loader::open_session(&config, &inputs).await?;
            let hits = session.search_zones(query);

            if hits.is_empty() {
                println!("\"{}\" に一致するエリアが見つかりません。", query);
            } else {
                println!("検索結果: {}件", hits.len());
                for id in hits {
                    println!("  {}", session.tooltip_for(&id));
                }
            }
        }

        Commands::Export { source, assignments, format, output, changes_only, changes_zip, include_clear } => {
            println!("📄 depot-zoning - エクスポート\n");

            println!("[1/3] エリアを読み込み中...");
            let inputs = inputs_for(&cli, &config, source.clone(), None)?;
            let mut session = loader::open_session(&config, &inputs).await?;
            println!("✔ {}エリア\n", session.catalog().len());

            if let Some(path) = assignments {
                println!("[2/3] 割当CSVを適用中...");
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("割当CSVを読めません: {}", path.display()))?;
                let report = session.apply_overrides(&text)?;
                println!("✔ {}件を適用", report.applied);
                if report.unknown_zone > 0 {
                    println!("- 不明なエリア: {}件", report.unknown_zone);
                }
                if report.out_of_scope > 0 {
                    println!("- 対象外エリア: {}件", report.out_of_scope);
                }
                println!();
            }

            println!("[3/3] 出力中...");
            let output_dir = output.clone().unwrap_or_else(|| PathBuf::from("."));
            match changes_zip {
                Some(asis) => {
                    let rows = loader::read_table(asis).await?;
                    let report = session.zip_change_report(&rows, *include_clear)?;
                    export::export_zip_report(&report, &output_dir)?;
                }
                None => {
                    export::export_session(&session, format, &output_dir, *changes_only)?;
                }
            }

            println!("\n✅ エクスポート完了");
        }

        Commands::Session { source, town_source } => {
            let inputs = inputs_for(&cli, &config, source.clone(), town_source.clone())?;
            let session = loader::open_session(&config, &inputs).await?;
            let sources = PrewarmSources {
                municipality: inputs.zone_source.clone(),
                town: inputs.town_source.clone(),
            };
            repl::run_session(session, &config, sources).await?;
        }

        Commands::Config { set_reference, set_source, show } => {
            let mut config = config;
            let mut changed = false;

            if let Some(path) = set_reference {
                config.reference_path = Some(path.clone());
                changed = true;
                println!("✔ 配車エリア表を設定しました");
            }
            if let Some(path) = set_source {
                config.zone_source_path = Some(path.clone());
                changed = true;
                println!("✔ エリアGeoJSONを設定しました");
            }
            if changed {
                config.save()?;
            }

            if *show || !changed {
                let display = |p: &Option<PathBuf>| {
                    p.as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "未設定".into())
                };
                println!("設定: {}", Config::config_path()?.display());
                println!("  エリアGeoJSON: {}", display(&config.zone_source_path));
                println!("  町丁目GeoJSON: {}", display(&config.town_source_path));
                println!("  配車エリア表: {}", display(&config.reference_path()));
                println!("  運用対象リスト: {}", display(&config.in_scope_path));
                println!("  表示地域: {}", config.visible_regions.join(", "));
                println!("  履歴上限: {}", config.history_limit);
                println!("  町丁目表示ズーム: {}", config.town_detail_min_zoom);
            }
        }
    }

    Ok(())
}
