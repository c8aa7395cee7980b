use crate::ui::theme::Theme;
use ratatui::style::{Color as TuiColor, Style};
use ratatui::text::{Line, Span};
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const CACHE_CAPACITY: usize = 64;

type CacheKey = (String, u64);

/// Bounded FIFO cache of highlighted blocks, keyed by normalized language
/// and a hash of code plus theme signature.
struct HighlightCache {
    map: HashMap<CacheKey, Vec<Line<'static>>>,
    order: VecDeque<CacheKey>,
    cap: usize,
}

impl HighlightCache {
    fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Vec<Line<'static>>> {
        self.map.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, lines: Vec<Line<'static>>) {
        if !self.map.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.map.insert(key, lines);
        while self.map.len() > self.cap {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

static CACHE: Mutex<Option<HighlightCache>> = Mutex::new(None);
static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn cached(key: &CacheKey) -> Option<Vec<Line<'static>>> {
    CACHE.lock().ok()?.as_ref()?.get(key)
}

fn store(key: CacheKey, lines: Vec<Line<'static>>) {
    if let Ok(mut guard) = CACHE.lock() {
        guard
            .get_or_insert_with(|| HighlightCache::new(CACHE_CAPACITY))
            .put(key, lines);
    }
}

fn hash_code(lang: &str, code: &str, theme_sig: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    theme_sig.hash(&mut hasher);
    hasher.finish()
}

fn is_dark_background(c: &TuiColor) -> bool {
    match c {
        TuiColor::Rgb(r, g, b) => {
            let luma = 0.2126 * (*r as f32) + 0.7152 * (*g as f32) + 0.0722 * (*b as f32);
            luma < 128.0
        }
        TuiColor::White | TuiColor::Gray => false,
        _ => true,
    }
}

pub(crate) fn normalize_lang_hint(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" | "python" | "python3" => "python".into(),
        "bash" | "sh" | "zsh" | "shell" | "console" => "bash".into(),
        "js" | "javascript" | "jsx" | "mjs" => "javascript".into(),
        "ts" | "tsx" | "typescript" => "typescript".into(),
        "yaml" | "yml" => "yaml".into(),
        "rust" | "rs" => "rust".into(),
        "c" | "h" => "c".into(),
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" => "cpp".into(),
        "kotlin" | "kt" => "kotlin".into(),
        "golang" => "go".into(),
        "md" | "markdown" => "markdown".into(),
        other => other.into(),
    }
}

/// Syntect theme matching the background brightness.
pub(crate) fn syntect_theme_name(theme: &Theme) -> &'static str {
    if is_dark_background(&theme.background_color) {
        "base16-ocean.dark"
    } else {
        "InspiredGitHub"
    }
}

fn theme_signature(theme: &Theme, syntect_theme: &str) -> String {
    format!(
        "{}|{:?}|{:?}",
        syntect_theme, theme.codeblock_bg, theme.background_color
    )
}

/// Highlight `code` as `lang_hint`, one [`Line`] per source line.
///
/// Returns `None` when no syntect theme is available or highlighting
/// fails; callers fall back to plain code styling.
pub fn highlight_code_block(
    lang_hint: &str,
    code: &str,
    theme: &Theme,
) -> Option<Vec<Line<'static>>> {
    let lang = normalize_lang_hint(lang_hint);
    let ps = SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines);
    let ts = THEME_SET.get_or_init(ThemeSet::load_defaults);

    let theme_name = syntect_theme_name(theme);
    let syn_theme = ts
        .themes
        .get(theme_name)
        .or_else(|| ts.themes.get("base16-ocean.dark"))?;

    let key = (
        lang.clone(),
        hash_code(&lang, code, &theme_signature(theme, theme_name)),
    );
    if let Some(lines) = cached(&key) {
        return Some(lines);
    }

    let syntax = ps
        .find_syntax_by_token(&lang)
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, syn_theme);

    let mut out: Vec<Line<'static>> = Vec::new();
    for line in LinesWithEndings::from(code) {
        let ranges = highlighter.highlight_line(line, ps).ok()?;
        let spans: Vec<Span<'static>> = ranges
            .into_iter()
            .filter_map(|(style, text)| {
                let text = text.strip_suffix('\n').unwrap_or(text);
                let text = text.strip_suffix('\r').unwrap_or(text);
                if text.is_empty() {
                    return None;
                }
                let fg = style.foreground;
                let mut st = Style::default().fg(TuiColor::Rgb(fg.r, fg.g, fg.b));
                if let Some(bg) = theme.codeblock_bg {
                    st = st.bg(bg);
                }
                Some(Span::styled(text.replace('\t', "    "), st))
            })
            .collect();
        out.push(Line::from(spans));
    }

    store(key, out.clone());
    Some(out)
}
