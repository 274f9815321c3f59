use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use super::{SearchSession, StoreError};

const MAX_SLUG_CHARS: usize = 50;

pub enum ExportScope<'a> {
    One(&'a SearchSession),
    All(&'a [SearchSession]),
}

/// Writes sessions as pretty JSON into `dir` and returns the file path.
///
/// One session: `pesquisa-<slug>-<date>.json` holding the session object.
/// All sessions: `historico-pesquisas-<date>.json` holding the history array.
pub fn export_sessions(
    scope: ExportScope<'_>,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, StoreError> {
    let (filename, json) = match scope {
        ExportScope::One(session) => (
            format!("pesquisa-{}-{date}.json", slugify(&session.query)),
            serde_json::to_string_pretty(session)?,
        ),
        ExportScope::All(sessions) => (
            format!("historico-pesquisas-{date}.json"),
            serde_json::to_string_pretty(sessions)?,
        ),
    };

    let path = dir.join(filename);
    write_file(&path, json)?;
    info!(path = %path.display(), "sessions exported");
    Ok(path)
}

/// Wraps an article body fragment into a standalone HTML document.
pub fn export_article(html: &str, query: &str, dir: &Path) -> Result<PathBuf, StoreError> {
    let path = dir.join(format!("artigo-{}.html", slugify(query)));
    write_file(&path, article_document(html, query))?;
    info!(path = %path.display(), "article exported");
    Ok(path)
}

fn article_document(body: &str, query: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
body {{ font-family: 'Times New Roman', Times, serif; font-size: 12pt; line-height: 1.5; max-width: 21cm; margin: 2.5cm auto; padding: 0 1cm; color: #000; background: #fff; }}
h1 {{ text-align: center; font-size: 14pt; }}
h2 {{ font-size: 12pt; text-transform: uppercase; }}
p {{ text-align: justify; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(query),
    )
}

fn write_file(path: &Path, contents: String) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

/// Lowercase ASCII slug for file names; accents are folded, everything else becomes `-`.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.chars().map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(MAX_SLUG_CHARS);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "pesquisa".to_string()
    } else {
        slug.to_string()
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::make_session;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn slugify_folds_accents_and_collapses_separators() {
        assert_eq!(slugify("Educação  Inclusiva no Brasil!"), "educacao-inclusiva-no-brasil");
        assert_eq!(slugify("  --Rust & WebAssembly--  "), "rust-webassembly");
        assert_eq!(slugify("???"), "pesquisa");
        assert!(slugify(&"palavra ".repeat(40)).len() <= MAX_SLUG_CHARS);
    }

    #[test]
    fn exports_single_session_as_object() {
        let dir = TempDir::new().unwrap();
        let session = make_session("Mudanças Climáticas", 1, &["https://a.com"]);

        let path = export_sessions(ExportScope::One(&session), dir.path(), date()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "pesquisa-mudancas-climaticas-2025-03-14.json"
        );
        let written: SearchSession =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, session);
    }

    #[test]
    fn exports_all_sessions_as_array() {
        let dir = TempDir::new().unwrap();
        let sessions = vec![make_session("a", 2, &[]), make_session("b", 1, &[])];

        let path = export_sessions(ExportScope::All(&sessions), dir.path(), date()).unwrap();

        assert!(path.ends_with("historico-pesquisas-2025-03-14.json"));
        let written: Vec<SearchSession> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn article_export_wraps_fragment_in_document() {
        let dir = TempDir::new().unwrap();
        let body = "<h1>Título</h1><p>Texto.</p>";

        let path = export_article(body, "IA <na> educação", dir.path()).unwrap();

        assert!(path.ends_with("artigo-ia-na-educacao.html"));
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"UTF-8\">"));
        assert!(html.contains("<title>IA &lt;na&gt; educação</title>"));
        assert!(html.contains(body));
        assert!(html.contains("Times New Roman"));
    }

    #[test]
    fn export_creates_target_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("exports/2025");
        let path = export_article("<p>x</p>", "q", &target).unwrap();
        assert!(path.exists());
    }
}
