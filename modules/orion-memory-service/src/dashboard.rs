//! Dashboard HTML page handler for the orion memory service.

use crate::answer::{PROVENANCE_LIMIT, provenance_lines};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let subject = state.default_subject.as_str();
    let stats = state.store.stats().ok();
    let facts = state.store.get_facts(subject).unwrap_or_default();
    let style = state.store.get_pref(subject).unwrap_or_default();
    let policy = state.store.policy();
    let uptime = state.start_time.elapsed().as_secs();

    let stats_html = if let Some(s) = &stats {
        format!(
            r#"<div class="stats">
                <div class="stat"><span class="val">{}</span><span class="lbl">Total Facts</span></div>
                <div class="stat green"><span class="val">{}/{}</span><span class="lbl">{} Facts / Limit</span></div>
                <div class="stat yellow"><span class="val">{}</span><span class="lbl">Subjects</span></div>
            </div>"#,
            s.total_facts,
            facts.len(),
            policy.limit,
            escape_html(subject),
            s.subject_count
        )
    } else {
        "<p>No stats available.</p>".to_string()
    };

    let mut fact_rows = String::new();
    for f in &facts {
        fact_rows.push_str(&format!(
            "<tr><td class=\"mono\">{}</td><td>{}</td><td><span class=\"chip\">{}</span></td><td class=\"mono\">{}</td></tr>\n",
            f.id,
            escape_html(&f.text),
            escape_html(&f.origin),
            escape_html(&f.created_at),
        ));
    }
    if fact_rows.is_empty() {
        fact_rows = "<tr><td colspan=\"4\">No facts stored yet.</td></tr>".to_string();
    }

    let origin_chips: String = stats
        .as_ref()
        .map(|s| {
            s.by_origin
                .iter()
                .map(|o| format!("<span class=\"chip\">{} &times; {}</span>\n", escape_html(&o.origin), o.count))
                .collect()
        })
        .unwrap_or_default();

    let provenance_items: String = provenance_lines(&facts, PROVENANCE_LIMIT)
        .iter()
        .map(|line| format!("<li>{}</li>\n", escape_html(line)))
        .collect();

    let uptime_str = format_uptime(uptime);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Orion Memory Dashboard</title>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #0f1117; color: #e0e0e0; padding: 20px; }}
  h1 {{ color: #58a6ff; margin-bottom: 8px; }}
  .meta {{ color: #8b949e; font-size: 0.85em; margin-bottom: 20px; }}
  .stats {{ display: flex; gap: 16px; margin-bottom: 24px; flex-wrap: wrap; }}
  .stat {{ background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 16px 24px; text-align: center; min-width: 140px; }}
  .stat .val {{ display: block; font-size: 2em; font-weight: bold; color: #58a6ff; }}
  .stat.green .val {{ color: #3fb950; }}
  .stat.yellow .val {{ color: #d29922; }}
  .stat .lbl {{ display: block; font-size: 0.85em; color: #8b949e; margin-top: 4px; }}
  table {{ width: 100%; border-collapse: collapse; margin-bottom: 24px; }}
  th {{ background: #161b22; color: #8b949e; text-align: left; padding: 8px 12px; font-size: 0.85em; text-transform: uppercase; border-bottom: 1px solid #30363d; }}
  td {{ padding: 8px 12px; border-bottom: 1px solid #21262d; font-size: 0.9em; }}
  tr:hover {{ background: #161b22; }}
  .mono {{ font-family: 'SF Mono', 'Consolas', monospace; font-size: 0.85em; }}
  h2 {{ color: #c9d1d9; margin-bottom: 12px; font-size: 1.1em; }}
  .section {{ margin-bottom: 28px; }}
  .chip {{ display: inline-block; background: #21262d; border: 1px solid #30363d; color: #8b949e; padding: 4px 10px; border-radius: 12px; font-size: 0.8em; margin: 3px; }}
  ul {{ list-style: none; }}
  li {{ padding: 4px 0; font-size: 0.85em; color: #8b949e; }}
</style>
</head>
<body>
  <h1>Orion Memory</h1>
  <p class="meta">Uptime: {uptime_str} &middot; Answer style: {style} &middot; Prunes {take} oldest above {limit}</p>

  {stats_html}

  <div class="section">
    <h2>Origins</h2>
    <div>{origin_chips}</div>
  </div>

  <div class="section">
    <h2>Facts (newest first)</h2>
    <table>
      <thead><tr><th>ID</th><th>Text</th><th>Origin</th><th>Created</th></tr></thead>
      <tbody>{fact_rows}</tbody>
    </table>
  </div>

  <div class="section">
    <h2>Provenance</h2>
    <ul>{provenance_items}</ul>
  </div>

  <script>setTimeout(() => location.reload(), 30000);</script>
</body>
</html>"#,
        uptime_str = uptime_str,
        style = style,
        take = policy.take,
        limit = policy.limit,
        stats_html = stats_html,
        origin_chips = origin_chips,
        fact_rows = fact_rows,
        provenance_items = provenance_items,
    );

    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
