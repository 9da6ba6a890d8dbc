use std::io::{self, Write};
use std::path::{Path, PathBuf};

use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use serde::Deserialize;

use msgtmpl::Template;
use msgtmpl::block::topic::split_posts;
use msgtmpl::parser::Parser;
use renderer::{DeliveryRun, Generator, RenderError};

const SUFFIX: &str = ".test.txt";

/// Which message a test case renders.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Driver,
    Group,
    Backup,
}

/// Settings between the `---` fences of a `.test.txt` case.
#[derive(Debug, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub kind: MessageKind,

    /// Driver user name for driver messages. Defaults to the run's first
    /// driver.
    #[serde(default)]
    pub driver: Option<String>,

    /// Exact rendered message.
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Substring of the render error's message.
    #[serde(default)]
    pub expect_error: Option<String>,

    #[serde(default)]
    pub expect_parse_error: bool,

    #[serde(default)]
    pub run: Option<DeliveryRun>,
}

/// Split a case into its settings and the template topic that follows them.
fn split_case(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let rest = content
        .strip_prefix("---")
        .ok_or("missing opening --- fence")?;
    let (settings, topic) = rest
        .split_once("\n---")
        .ok_or("missing closing --- fence")?;
    let topic = topic
        .strip_prefix("\r\n")
        .or_else(|| topic.strip_prefix('\n'))
        .unwrap_or(topic);
    let config = toml::from_str(settings).map_err(|e| format!("bad settings: {}", e))?;
    Ok((config, topic))
}

fn render(config: &TestConfig, template: &Template) -> Result<Result<String, RenderError>, String> {
    let run = config.run.as_ref().ok_or("no [run] table in settings")?;
    let generator = Generator::new(run);
    Ok(match config.kind {
        MessageKind::Driver => {
            let driver = match &config.driver {
                Some(name) => run
                    .driver(name)
                    .ok_or_else(|| format!("no driver `{}` in [run]", name))?,
                None => run.drivers.first().ok_or("[run] has no drivers")?,
            };
            generator.driver_message(template, driver)
        }
        MessageKind::Group => generator.group_instructions(template),
        MessageKind::Backup => generator.backup_driver_message(template),
    })
}

/// Parse and render one case against its expectations. `Err` carries the
/// reason it failed.
fn check(config: &TestConfig, topic: &str) -> Result<(), String> {
    let parsed = Template::parse(&split_posts(topic), &Parser::new());
    let template = match (parsed, config.expect_parse_error) {
        (Err(_), true) => return Ok(()),
        (Ok(_), true) => return Err("expected a parse error, but the template parsed".into()),
        (Err(errors), false) => {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(format!("unexpected parse error: {}", messages.join("; ")));
        }
        (Ok(template), false) => template,
    };

    match (render(config, &template)?, &config.expect_error) {
        (Err(err), Some(expected)) if err.to_string().contains(expected.as_str()) => Ok(()),
        (Err(err), Some(expected)) => Err(format!(
            "expected error containing \"{}\", got: {}",
            expected, err
        )),
        (Ok(_), Some(expected)) => Err(format!(
            "expected error containing \"{}\", but rendering succeeded",
            expected
        )),
        (Err(err), None) => Err(format!("unexpected render error: {}", err)),
        (Ok(actual), None) => match &config.expect_output {
            Some(expected) if &actual != expected => Err(format!(
                "output mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            )),
            _ => Ok(()),
        },
    }
}

/// A discovered case file and the directory it sits in, relative to the
/// path given on the command line.
struct Case {
    category: String,
    path: PathBuf,
}

impl Case {
    /// Run the case, returning its label and the failure reason, if any.
    fn run(&self) -> (String, Option<String>) {
        let stem = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim_end_matches(SUFFIX).to_string())
            .unwrap_or_default();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => return (stem, Some(format!("cannot read file: {}", e))),
        };
        match split_case(&content) {
            Ok((config, topic)) => (
                config.description.clone().unwrap_or(stem),
                check(&config, topic).err(),
            ),
            Err(e) => (stem, Some(e)),
        }
    }
}

/// Every case under `path`, sorted by category then file. A file path is a
/// single uncategorized case.
fn discover(path: &Path) -> Vec<Case> {
    let mut cases = Vec::new();
    if path.is_file() {
        cases.push(Case {
            category: String::new(),
            path: path.to_path_buf(),
        });
    } else {
        walk(path, path, &mut cases);
    }
    cases.sort_by(|a, b| (&a.category, &a.path).cmp(&(&b.category, &b.path)));
    cases
}

fn walk(dir: &Path, root: &Path, cases: &mut Vec<Case>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            walk(&path, root, cases);
        } else if path.to_string_lossy().ends_with(SUFFIX) {
            let category = dir
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            cases.push(Case { category, path });
        }
    }
}

/// `category` selects itself and its subfolders.
fn selected(case: &Case, categories: &[String]) -> bool {
    categories.is_empty()
        || categories.iter().any(|wanted| {
            let wanted = wanted.trim_matches('/');
            case.category == wanted
                || case
                    .category
                    .strip_prefix(wanted)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    let cases = discover(path);
    if cases.is_empty() {
        eprintln!("no {} files found in {}", SUFFIX, path.display());
        return;
    }
    eprintln!("available categories:");
    for group in cases.chunk_by(|a, b| a.category == b.category) {
        eprintln!("  {} ({} tests)", category_label(&group[0].category), group.len());
    }
}

/// Test progress on stderr, colored unless `--no-color`.
struct Console {
    out: StandardStream,
}

impl Console {
    fn new(no_color: bool) -> Self {
        let choice = if no_color { ColorChoice::Never } else { ColorChoice::Auto };
        Console {
            out: StandardStream::stderr(choice),
        }
    }

    fn styled(&mut self, text: &str, spec: &ColorSpec) -> io::Result<()> {
        self.out.set_color(spec)?;
        write!(self.out, "{}", text)?;
        self.out.reset()
    }

    fn status(&mut self, ok: bool, label: &str) -> io::Result<()> {
        let (text, color) = if ok { ("PASS", Color::Green) } else { ("FAIL", Color::Red) };
        write!(self.out, "  ")?;
        self.styled(text, ColorSpec::new().set_fg(Some(color)))?;
        writeln!(self.out, "  {}", label)
    }

    fn header(&mut self, category: &str) -> io::Result<()> {
        writeln!(self.out)?;
        self.styled(category_label(category), ColorSpec::new().set_bold(true))?;
        writeln!(self.out)
    }

    fn report(&mut self, passed: usize, failures: &[(&Case, String)]) -> io::Result<()> {
        if !failures.is_empty() {
            writeln!(self.out, "\nfailures:")?;
            for (case, reason) in failures {
                writeln!(self.out, "\n  --- {} ---", case.path.display())?;
                for line in reason.lines() {
                    writeln!(self.out, "  {}", line)?;
                }
            }
        }
        write!(self.out, "\ntest result: ")?;
        let (word, color) = if failures.is_empty() {
            ("ok", Color::Green)
        } else {
            ("FAILED", Color::Red)
        };
        self.styled(word, ColorSpec::new().set_fg(Some(color)))?;
        writeln!(
            self.out,
            ". {} passed, {} failed",
            passed,
            failures.len()
        )
    }
}

/// Run every case under `path` (a directory or one file), limited to
/// `categories` when any are given. Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let cases = discover(path);
    if cases.is_empty() {
        eprintln!("no {} files found in {}", SUFFIX, path.display());
        return 1;
    }
    for wanted in categories {
        let known = cases.iter().any(|case| selected(case, std::slice::from_ref(wanted)));
        if !known {
            eprintln!("warning: category '{}' not found", wanted.trim_matches('/'));
        }
    }
    let cases: Vec<&Case> = cases.iter().filter(|case| selected(case, categories)).collect();
    if cases.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut console = Console::new(no_color);
    let mut passed = 0;
    let mut failures = Vec::new();
    for group in cases.chunk_by(|a, b| a.category == b.category) {
        if path.is_dir() {
            let _ = console.header(&group[0].category);
        }
        for case in group {
            let (label, failure) = case.run();
            let _ = console.status(failure.is_none(), &label);
            match failure {
                Some(reason) => failures.push((*case, reason)),
                None => passed += 1,
            }
        }
    }
    let _ = console.report(passed, &failures);
    i32::from(!failures.is_empty())
}
