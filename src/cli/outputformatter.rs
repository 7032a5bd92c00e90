use terminal_size::{terminal_size, Height, Width};

use crate::store::{display_value, QueryResult};

/// Print a capped query result as an ASCII table sized to the terminal, or as
/// JSON when `F1DB_OUTPUT=json`.
pub fn print_query_result(res: &QueryResult) {
    if json_output_requested() {
        println!("{}", res.to_json());
        return;
    }
    let rows: Vec<Vec<String>> = res.rows.iter().map(|r| r.iter().map(display_value).collect()).collect();
    for line in render_table(&res.columns, &rows, get_terminal_width()) {
        println!("{line}");
    }
    let mut summary = format!("rows: {}, cols: {}", rows.len(), res.columns.len());
    if res.truncated {
        summary.push_str(" (more rows not shown)");
    }
    println!("{summary}");
}

pub fn json_output_requested() -> bool {
    std::env::var("F1DB_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

/// Lay out `rows` under `columns`, every line at most `termw` visible chars.
pub fn render_table(columns: &[String], rows: &[Vec<String>], termw: usize) -> Vec<String> {
    let mut widths: Vec<usize> = columns.iter().map(|s| visible_len(s).min(termw)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(columns.len()) {
            let w = visible_len(cell);
            if w > widths[i] { widths[i] = w.min(termw); }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 4);
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&build_row_header_colored(columns, &widths), termw));
    out.push(fit_line_to_width(&sep, termw));
    for r in rows {
        out.push(fit_line_to_width(&build_row(r, &widths), termw));
    }
    out.push(fit_line_to_width(&sep, termw));
    out
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn build_row_header_colored(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let text = truncate(cells.get(i).map(String::as_str).unwrap_or(""), *w);
        s.push(' ');
        s.push_str(&format!("\x1b[32m{}\x1b[0m", text)); // green
        s.push_str(&" ".repeat(w.saturating_sub(visible_len(&text))));
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

// crude detection for aligning numbers to the right
fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().any(|c| c.is_ascii_digit()) && st.chars().all(|c| c.is_ascii_digit() || ".-+eE".contains(c))
}

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) => (w as usize).saturating_sub(4).max(20),
        None => 80,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw { return s.to_string(); }
    elide_middle_preserving_ansi(s, maxw)
}

// Split into (is_escape, text) runs; CSI sequences are ESC '[' ... letter.
fn ansi_runs(s: &str) -> Vec<(bool, &str)> {
    let bytes = s.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i] == 0x1B {
            i += 1;
            if i < bytes.len() && bytes[i] == b'[' {
                i += 1;
                while i < bytes.len() {
                    let b = bytes[i];
                    i += 1;
                    if b.is_ascii_alphabetic() { break; }
                }
            }
            runs.push((true, &s[start..i]));
        } else {
            while i < bytes.len() && bytes[i] != 0x1B { i += 1; }
            runs.push((false, &s[start..i]));
        }
    }
    runs
}

/// Visible chars, ANSI escapes excluded.
fn visible_len(s: &str) -> usize {
    ansi_runs(s).iter().filter(|(esc, _)| !esc).map(|(_, t)| t.chars().count()).sum()
}

fn elide_middle_preserving_ansi(s: &str, maxw: usize) -> String {
    if maxw <= 3 { return "…".repeat(maxw.min(1)); }
    let budget = maxw - 3;
    let front_keep = budget / 2;
    let back_keep = budget - front_keep;
    let runs = ansi_runs(s);

    let mut front = String::new();
    let mut taken = 0usize;
    for (esc, text) in &runs {
        if *esc {
            front.push_str(text);
            continue;
        }
        if taken >= front_keep { break; }
        let part: String = text.chars().take(front_keep - taken).collect();
        taken += part.chars().count();
        front.push_str(&part);
    }

    let mut back: Vec<String> = Vec::new();
    let mut taken = 0usize;
    for (esc, text) in runs.iter().rev() {
        if *esc {
            back.push(text.to_string());
            continue;
        }
        if taken >= back_keep { break; }
        let n = text.chars().count();
        let keep = (back_keep - taken).min(n);
        back.push(text.chars().skip(n - keep).collect());
        taken += keep;
    }
    back.reverse();

    // reset at the end so a cut escape cannot bleed colour
    format!("{front}...{}\x1b[0m", back.concat())
}
