mod logging;
mod report;
mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};

use msgtmpl::Template;
use renderer::{DeliveryRun, FileSource, Generator, LoadError, RenderError, TemplateSource};

use crate::report::Reporter;

#[derive(Parser)]
#[command(name = "drivermsg", version, about = "Render delivery-run messages from templates")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse templates and report every error
    Check(CheckArgs),

    /// Render the messages of a delivery run
    Render(RenderArgs),

    /// Run .test.txt template test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Template topic files or post directories
    #[arg(required = true)]
    templates: Vec<String>,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Delivery run (TOML)
    #[arg(long)]
    run: String,

    /// Driver message template
    #[arg(long)]
    drivers: String,

    /// Group instructions template
    #[arg(long)]
    group: Option<String>,

    /// Backup driver notice template
    #[arg(long)]
    backup: Option<String>,

    /// Render only this driver's message (user name, case-insensitive)
    #[arg(long)]
    driver: Option<String>,

    /// List the blocks of each template instead of rendering
    #[arg(long)]
    list_blocks: bool,

    /// Dump parsed element trees
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.txt file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Check(args) => do_check(args, cli.no_color),
        Command::Render(args) => do_render(args, cli.no_color),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            test_runner::run_tests(path, cli.no_color, &args.category)
        }
    };
    process::exit(exit_code);
}

/// Read and parse one template, reporting problems. `None` when it cannot be
/// used.
fn load(reporter: &mut Reporter, origin: &str) -> Option<Template> {
    let source = FileSource::new(origin);
    let posts = match source.posts() {
        Ok(posts) if posts.is_empty() => {
            let err = LoadError::Empty {
                origin: source.describe(),
            };
            eprintln!("error: {}", err);
            return None;
        }
        Ok(posts) => posts,
        Err(err) => {
            eprintln!("error: {}", err);
            return None;
        }
    };
    reporter.add_posts(origin, &posts);

    match Template::parse(&posts, &msgtmpl::parser::Parser::new()) {
        Ok(template) => Some(template),
        Err(errors) => {
            reporter.parse_errors(origin, &errors);
            None
        }
    }
}

fn do_check(args: CheckArgs, no_color: bool) -> i32 {
    let mut reporter = Reporter::new(no_color);
    let mut failed = false;
    for origin in &args.templates {
        match load(&mut reporter, origin) {
            Some(template) => eprintln!(
                "ok: {} ({} blocks, {} renderable)",
                origin,
                template.blocks.len(),
                template.renderable().count()
            ),
            None => failed = true,
        }
    }
    i32::from(failed)
}

fn do_render(args: RenderArgs, no_color: bool) -> i32 {
    let mut reporter = Reporter::new(no_color);

    // Every template must parse before anything is rendered.
    let drivers = load(&mut reporter, &args.drivers);
    let group = args.group.as_deref().map(|origin| (origin, load(&mut reporter, origin)));
    let backup = args.backup.as_deref().map(|origin| (origin, load(&mut reporter, origin)));

    let Some(drivers) = drivers else { return 1 };
    let group = match group {
        Some((origin, Some(template))) => Some((origin, template)),
        Some((_, None)) => return 1,
        None => None,
    };
    let backup = match backup {
        Some((origin, Some(template))) => Some((origin, template)),
        Some((_, None)) => return 1,
        None => None,
    };

    let templates: Vec<(&str, &Template)> = std::iter::once((args.drivers.as_str(), &drivers))
        .chain(group.iter().map(|(origin, t)| (*origin, t)))
        .chain(backup.iter().map(|(origin, t)| (*origin, t)))
        .collect();

    if args.list_blocks {
        for (origin, template) in &templates {
            println!("{}", origin);
            for block in &template.blocks {
                let note = if block.is_comment() { " (not rendered)" } else { "" };
                println!("  post {:>3}  [{}]{}", block.post, block.name, note);
            }
        }
        return 0;
    }

    if args.ast {
        for (origin, template) in &templates {
            println!("{}", origin);
            println!("{:#?}", template.blocks);
        }
        return 0;
    }

    let run = match DeliveryRun::load(Path::new(&args.run)) {
        Ok(run) => run,
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };
    let generator = Generator::new(&run);

    let mut messages: Vec<(String, &str, Result<String, RenderError>)> = Vec::new();
    match &args.driver {
        Some(user_name) => {
            let Some(driver) = run.driver(user_name) else {
                eprintln!("error: no driver `{}` in {}", user_name, args.run);
                return 1;
            };
            messages.push((
                format!("driver {}", driver.user_name),
                args.drivers.as_str(),
                generator.driver_message(&drivers, driver),
            ));
        }
        None => {
            for message in generator.driver_messages(&drivers) {
                messages.push((
                    format!("driver {}", message.driver.user_name),
                    args.drivers.as_str(),
                    message.message,
                ));
            }
        }
    }
    if let Some((origin, template)) = &group {
        messages.push((
            "group instructions".to_string(),
            *origin,
            generator.group_instructions(template),
        ));
    }
    if let Some((origin, template)) = &backup {
        messages.push((
            "backup driver".to_string(),
            *origin,
            generator.backup_driver_message(template),
        ));
    }

    let headers = messages.len() > 1;
    let mut failed = false;
    for (title, origin, result) in messages {
        match result {
            Ok(text) => {
                if headers {
                    println!("===== {} =====", title);
                }
                print!("{}", text);
            }
            Err(err) => {
                failed = true;
                eprintln!("error: cannot render {}", title);
                reporter.render_error(origin, &err);
            }
        }
    }
    i32::from(failed)
}
