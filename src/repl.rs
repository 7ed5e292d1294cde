//! 対話式セッション
//!
//! 地図の代わりにコマンドでエリアを選択・割当する。
//!
//! ## コマンド
//! - `click <ID>` / `brush <ID> <ID> ...` : 選択（ブラシは先頭を押下して順に通過）
//! - `assign <SGM|FUJ|YOK>` / `unassign` : 選択中のエリアに割当・解除
//! - `clear` / `undo` / `redo` : 選択の解除・取り消し・やり直し
//! - `hide <地域>` / `show <地域>` / `zoom <値>` : 表示切替（再構築は遅延実行）
//! - `filter [市区町村]` / `search <語>` / `jump <語>` / `info <ID>`
//! - `reset` / `stats` / `export [csv|excel|both|changes] [出力先]` / `quit`

use crate::cli::ExportFormat;
use crate::config::Config;
use crate::error::{Result, ZoningError};
use crate::export;
use crate::scheduler::{run_ticket, DeferredScheduler, PrewarmSources};
use dialoguer::Input;
use std::path::PathBuf;
use zoning_common::{DeferredKind, ZoningSession};

/// REPLコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Click(String),
    Brush(Vec<String>),
    Assign(String),
    Unassign,
    Clear,
    Undo,
    Redo,
    Hide(String),
    Show(String),
    Zoom(f64),
    Filter(Option<String>),
    Search(String),
    Jump(String),
    Info(String),
    Reset,
    Stats,
    Export {
        format: ExportFormat,
        changes_only: bool,
        output: Option<PathBuf>,
    },
    Help,
    Quit,
}

/// ループを続けるか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn require_arg(cmd: &str, rest: &str) -> std::result::Result<String, String> {
    if rest.is_empty() {
        Err(format!("{} には引数が必要です", cmd))
    } else {
        Ok(rest.to_string())
    }
}

/// 1行をコマンドに変換
pub fn parse_command(line: &str) -> std::result::Result<ReplCommand, String> {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match cmd.to_lowercase().as_str() {
        "click" | "c" => Ok(ReplCommand::Click(require_arg(cmd, rest)?)),
        "brush" | "b" => {
            let ids: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            if ids.is_empty() {
                return Err("brush にはエリアIDを1つ以上指定してください".into());
            }
            Ok(ReplCommand::Brush(ids))
        }
        "assign" | "a" => Ok(ReplCommand::Assign(require_arg(cmd, rest)?)),
        "unassign" => Ok(ReplCommand::Unassign),
        "clear" => Ok(ReplCommand::Clear),
        "undo" | "u" => Ok(ReplCommand::Undo),
        "redo" | "r" => Ok(ReplCommand::Redo),
        "hide" => Ok(ReplCommand::Hide(require_arg(cmd, rest)?)),
        "show" => Ok(ReplCommand::Show(require_arg(cmd, rest)?)),
        "zoom" => rest
            .parse::<f64>()
            .map(ReplCommand::Zoom)
            .map_err(|_| format!("ズーム値が不正です: {}", rest)),
        "filter" => Ok(ReplCommand::Filter((!rest.is_empty()).then(|| rest.to_string()))),
        "search" | "s" => Ok(ReplCommand::Search(require_arg(cmd, rest)?)),
        "jump" | "j" => Ok(ReplCommand::Jump(require_arg(cmd, rest)?)),
        "info" | "i" => Ok(ReplCommand::Info(require_arg(cmd, rest)?)),
        "reset" => Ok(ReplCommand::Reset),
        "stats" => Ok(ReplCommand::Stats),
        "export" => {
            let mut format = ExportFormat::Csv;
            let mut changes_only = false;
            let mut output = None;
            for arg in rest.split_whitespace() {
                if arg.eq_ignore_ascii_case("changes") {
                    changes_only = true;
                } else if let Ok(f) = arg.parse::<ExportFormat>() {
                    format = f;
                } else {
                    output = Some(PathBuf::from(arg));
                }
            }
            Ok(ReplCommand::Export {
                format,
                changes_only,
                output,
            })
        }
        "help" | "h" | "?" => Ok(ReplCommand::Help),
        "quit" | "q" | "exit" => Ok(ReplCommand::Quit),
        "" => Err("コマンドを入力してください（help で一覧）".into()),
        other => Err(format!("不明なコマンド: {}（help で一覧）", other)),
    }
}

fn print_help() {
    println!("操作: click <ID> / brush <ID...> / assign <SGM|FUJ|YOK> / unassign / clear / undo / redo");
    println!("      hide <地域> / show <地域> / zoom <値> / filter [市区町村] / search <語> / jump <語> / info <ID>");
    println!("      reset / stats / export [csv|excel|both|changes] [出力先] / quit");
}

fn print_selection(session: &ZoningSession) {
    let ids = session.selected_ids();
    println!("選択中: {}件", ids.len());
    if !ids.is_empty() {
        let chips: Vec<String> = ids.iter().map(|id| session.chip_label_for(id)).collect();
        println!("  {}", chips.join(", "));
    }
}

fn print_stats(session: &ZoningSession) {
    let stats = session.stats();
    println!("総エリア数: {}", stats.total);
    println!("割当済み: {}", stats.assigned);
    println!("未割当: {}", stats.unassigned);
    for (depot, count) in &stats.by_depot {
        println!("{}: {}", depot.code(), count);
    }
}

/// コマンドを実行
pub fn execute(
    session: &mut ZoningSession,
    scheduler: &mut DeferredScheduler,
    command: ReplCommand,
) -> Result<Flow> {
    match command {
        ReplCommand::Click(id) => {
            if session.toggle(&id)? {
                print_selection(session);
            } else {
                println!("⚠ 運用対象外のエリアは選択できません: {}", id);
            }
        }
        ReplCommand::Brush(ids) => {
            let (first, rest) = ids.split_first().ok_or_else(|| ZoningError::Prompt("brush".into()))?;
            if !session.brush_down(first) {
                println!("⚠ 選択できないエリアです: {}", first);
                return Ok(Flow::Continue);
            }
            for id in rest {
                session.brush_enter(id);
            }
            session.brush_up()?;
            print_selection(session);
        }
        ReplCommand::Assign(code) => {
            if session.selection().is_empty() {
                println!("⚠ 先にエリアを選択してください");
                return Ok(Flow::Continue);
            }
            let count = session.assign_selected(&code)?;
            println!("✔ {}件を{}に割当", count, code.to_uppercase());
        }
        ReplCommand::Unassign => {
            if session.selection().is_empty() {
                println!("⚠ 先にエリアを選択してください");
                return Ok(Flow::Continue);
            }
            let count = session.clear_assignment_for_selected()?;
            println!("✔ {}件の割当を解除", count);
        }
        ReplCommand::Clear => {
            session.clear_selection();
            print_selection(session);
        }
        ReplCommand::Undo => {
            if !session.undo() {
                println!("これ以上取り消せません");
            }
            print_selection(session);
        }
        ReplCommand::Redo => {
            if !session.redo() {
                println!("これ以上やり直せません");
            }
            print_selection(session);
        }
        ReplCommand::Hide(region) | ReplCommand::Show(region) if !session.regions().contains(&region) => {
            println!("⚠ 不明な地域: {}（{}）", region, session.regions().into_iter().collect::<Vec<_>>().join(", "));
        }
        ReplCommand::Hide(region) => {
            if session.set_region_visible(&region, false) {
                scheduler.request_rebuild();
                println!("- {} を非表示", region);
            }
        }
        ReplCommand::Show(region) => {
            if session.set_region_visible(&region, true) {
                scheduler.request_rebuild();
                println!("- {} を表示", region);
            }
        }
        ReplCommand::Zoom(zoom) => {
            if session.set_zoom(zoom) {
                scheduler.request_rebuild();
                println!("- 表示を切替: {}", session.active_level());
            }
        }
        ReplCommand::Filter(municipality) => {
            session.set_municipality_filter(municipality.as_deref());
            match session.municipality_filter() {
                Some(m) => println!("- 絞り込み: {}", m),
                None => println!("- 絞り込み解除（{}市区町村）", session.municipalities().len()),
            }
        }
        ReplCommand::Search(query) => {
            let hits = session.search_zones(&query);
            if hits.is_empty() {
                println!("\"{}\" に一致するエリアが見つかりません。", query);
            }
            for id in hits {
                println!("  {}", session.tooltip_for(&id));
            }
        }
        ReplCommand::Jump(query) => {
            let hits = session.jump_to(&query);
            if hits.is_empty() {
                println!("\"{}\" に一致するエリアが見つかりません。", query);
            }
            print_selection(session);
        }
        ReplCommand::Info(id) => match (session.label_for(&id), session.style_inputs_for(&id)) {
            (Some(label), Some(style)) => {
                println!("{}", session.tooltip_for(&id));
                println!("  対応エリア: {}", if label.dispatch_label.is_empty() { "-" } else { label.dispatch_label.as_str() });
                println!("  郵便番号: {}", label.postal_codes_formatted);
                println!(
                    "  デポ: {}",
                    style.assigned_depot.map(|d| d.display_name()).unwrap_or("未割当")
                );
                if !style.in_scope {
                    println!("  (運用対象外)");
                }
            }
            _ => println!("⚠ エリアが見つかりません: {}", id),
        },
        ReplCommand::Reset => {
            session.reset_to_initial();
            println!("✔ 初期割当に戻しました");
        }
        ReplCommand::Stats => print_stats(session),
        ReplCommand::Export {
            format,
            changes_only,
            output,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            export::export_session(session, &format, &output, changes_only)?;
        }
        ReplCommand::Help => print_help(),
        ReplCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// 入力を待ちながら、期限が来た再構築・先読みを実行する
pub async fn run_session(mut session: ZoningSession, config: &Config, sources: PrewarmSources) -> Result<()> {
    let mut scheduler = DeferredScheduler::from_config(config);

    println!("🗺  depot-zoning - 対話セッション\n");
    println!(
        "✔ {}エリア（{}）",
        session.catalog().len(),
        session.active_level()
    );
    print_help();
    scheduler.request_prewarm();

    loop {
        let mut prompt = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt("zoning")
                .allow_empty(true)
                .interact_text()
        });

        let line = loop {
            tokio::select! {
                res = &mut prompt => break res,
                ticket = scheduler.next_due() => {
                    run_ticket(&mut session, &ticket, &sources).await;
                }
            }
        };
        let line = line
            .map_err(|e| ZoningError::Prompt(e.to_string()))?
            .map_err(|e| ZoningError::Prompt(e.to_string()))?;

        // 入力が速くても古いカタログで操作しない
        if session.rebuild_pending() {
            scheduler.cancel(DeferredKind::Rebuild);
            session.flush();
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                if !line.trim().is_empty() {
                    println!("⚠ {}", message);
                }
                continue;
            }
        };

        match execute(&mut session, &mut scheduler, command) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => println!("⚠ {}", e),
        }
        scheduler.request_prewarm();
    }

    println!("\n✅ セッション終了");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use zoning_common::session::DetailLevel;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("click KA14-1"), Ok(ReplCommand::Click("KA14-1".into())));
        assert_eq!(
            parse_command("brush a b  c"),
            Ok(ReplCommand::Brush(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(parse_command("zoom 13.5"), Ok(ReplCommand::Zoom(13.5)));
        assert_eq!(parse_command("filter"), Ok(ReplCommand::Filter(None)));
        assert_eq!(parse_command("filter 藤沢市"), Ok(ReplCommand::Filter(Some("藤沢市".into()))));
        assert_eq!(parse_command("QUIT"), Ok(ReplCommand::Quit));
        assert!(parse_command("zoom far").is_err());
        assert!(parse_command("click").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_parse_export() {
        assert_eq!(
            parse_command("export excel out"),
            Ok(ReplCommand::Export {
                format: ExportFormat::Excel,
                changes_only: false,
                output: Some(PathBuf::from("out")),
            })
        );
        assert_eq!(
            parse_command("export changes"),
            Ok(ReplCommand::Export {
                format: ExportFormat::Csv,
                changes_only: true,
                output: None,
            })
        );
    }

    fn session() -> ZoningSession {
        let source = r#"{"type": "FeatureCollection", "features": [
            {"properties": {"area_id": "A", "municipality": "藤沢市", "N03_001": "神奈川県"}},
            {"properties": {"area_id": "B", "municipality": "町田市", "N03_001": "東京都"}}
        ]}"#;
        let mut session = ZoningSession::default();
        session.load_source(DetailLevel::Municipality, source, "fp").unwrap();
        session
    }

    #[tokio::test]
    async fn test_execute_assign_flow() {
        let mut session = session();
        let mut scheduler = DeferredScheduler::new(Duration::from_millis(1), Duration::from_secs(60));

        execute(&mut session, &mut scheduler, ReplCommand::Brush(vec!["A".into(), "B".into()])).unwrap();
        assert_eq!(session.selection().len(), 2);
        execute(&mut session, &mut scheduler, ReplCommand::Assign("fuj".into())).unwrap();
        assert_eq!(session.stats().assigned, 2);
        assert!(execute(&mut session, &mut scheduler, ReplCommand::Assign("XXX".into())).is_err());
        assert_eq!(
            execute(&mut session, &mut scheduler, ReplCommand::Quit).unwrap(),
            Flow::Quit
        );
    }

    #[tokio::test]
    async fn test_execute_hide_schedules_rebuild() {
        let mut session = session();
        let mut scheduler = DeferredScheduler::new(Duration::from_millis(1), Duration::from_secs(60));

        execute(&mut session, &mut scheduler, ReplCommand::Hide("東京都".into())).unwrap();
        assert!(session.rebuild_pending());
        let ticket = scheduler.next_due().await;
        assert_eq!(ticket.kind, DeferredKind::Rebuild);
        assert!(run_ticket(&mut session, &ticket, &PrewarmSources::default()).await);
        assert_eq!(session.catalog().len(), 1);

        // 不明な地域は何もしない
        execute(&mut session, &mut scheduler, ReplCommand::Hide("大阪府".into())).unwrap();
        assert!(!session.rebuild_pending());
    }
}
