use msgtmpl::Template;
use msgtmpl::parser::Parser;
use pretty_assertions::assert_eq;
use renderer::error::{RefKind, ResolveError};
use renderer::{DeliveryRun, FileSource, Generator, LoadError, MemorySource, load_template};

const RUN_200: &str = r#"
[control]
version = "2-0-0"
backup_drivers = ["zed"]
on_call_ops_manager = { user_name = "opsy", phone = "555-0100" }

[[drivers]]
user_name = "alice"
name = "Alice A"

[[drivers.pickups]]
name = "Bopshop"
address = "9 Food Ave"
emoji = ":pizza:"
orders = 2

[[drivers.deliveries]]
name = "Bob"
address = "1 Main St"
restaurant = "Bopshop"
normal_rations = 2
is_condo = true

[[drivers.deliveries]]
name = "Carol"
address = "2 Oak St"
restaurant = "Bopshop"
normal_rations = 1
veggie_rations = 1
alt_phone = "none"

[[drivers]]
user_name = "dave"
"#;

fn template(posts: &[&str]) -> Template {
    let mut source = MemorySource::new();
    for raw in posts {
        source.push(*raw);
    }
    load_template(&source, &Parser::new()).expect("template failed to parse")
}

fn render_for(run_toml: &str, driver: &str, posts: &[&str]) -> String {
    let run = DeliveryRun::from_toml(run_toml).expect("bad run");
    let template = template(posts);
    let driver = run.driver(driver).expect("no such driver");
    Generator::new(&run)
        .driver_message(&template, driver)
        .expect("render failed")
}

fn with_version(version: &str) -> String {
    RUN_200.replace("\"2-0-0\"", &format!("\"{}\"", version))
}

#[test]
fn greeting_and_consumer_loop() {
    let out = render_for(
        RUN_200,
        "alice",
        &["[Base]\nHello ${DRIVER}\nLOOP &{Consumer} {\n- ${C.NAME} at ${C.ADDRESS}\n}\n"],
    );
    assert_eq!(out, "Hello alice\n- Bob at 1 Main St\n- Carol at 2 Oak St\n");
}

#[test]
fn line_repeats_once_per_element() {
    let posts = ["[Stops]\nYour stops:\n  ${Consumer.Name} (${consumer.Address})\nThanks!\n"];
    assert_eq!(
        render_for(RUN_200, "alice", &posts),
        "Your stops:\n  Bob (1 Main St)\n  Carol (2 Oak St)\nThanks!\n"
    );
    assert_eq!(render_for(RUN_200, "dave", &posts), "Your stops:\nThanks!\n");
}

#[test]
fn continue_skips_rest_of_iteration() {
    let posts = [concat!(
        "[Phones]\n",
        "LOOP &{Consumer} {\n",
        "${Consumer.Name}\n",
        "    IF NOT ${Consumer.HasAltPhone} THEN {\n",
        "        CONTINUE\n",
        "    }\n",
        "alt: ${Consumer.AltPhone}\n",
        "}\n",
    )];
    let out = render_for(&RUN_200.replace("alt_phone = \"none\"", "alt_phone = \"555-0199\""), "alice", &posts);
    assert_eq!(out, "Bob\nCarol\nalt: 555-0199\n");
}

#[test]
fn conditional_branches_are_exclusive() {
    let posts = ["[Condo]\nIF ${AnyCondo} THEN {\ncondo\n}\nIF NOT ${AnyCondo} THEN {\nhouse\n}\n"];
    assert_eq!(render_for(RUN_200, "alice", &posts), "condo\n");
    assert_eq!(render_for(RUN_200, "dave", &posts), "house\n");
}

#[test]
fn pickup_totals_and_struct_refs() {
    let posts = [
        "[Pickups]\nLOOP &{Pickup} {\n${Pickup.Emoji} ${Pickup.Name}: ${Pickup.NormalRations} normal, ${Pickup.VeggieRations} veggie\n}\n",
        "[Help]\nQuestions? ${OnCallOpsManager.UserName} ${OnCallOpsManager.Phone}\n",
    ];
    assert_eq!(
        render_for(RUN_200, "alice", &posts),
        ":pizza: Bopshop: 3 normal, 1 veggie\nQuestions? opsy 555-0100\n"
    );
}

#[test]
fn rendering_is_idempotent() {
    let run = DeliveryRun::from_toml(RUN_200).unwrap();
    let template = template(&["[A]\n${Consumer.Name}\nIF ${AnyCondo} THEN {\nc\n}\n"]);
    let generator = Generator::new(&run);
    let driver = run.driver("alice").unwrap();
    let first = generator.driver_message(&template, driver).unwrap();
    let second = generator.driver_message(&template, driver).unwrap();
    assert_eq!(first, second);
}

#[test]
fn version_specific_names_do_not_cross() {
    let posts_200 = ["[R]\nLOOP &{Consumer} {\n${Consumer.NormalRations}\n}\n"];
    let posts_300 = ["[R]\nLOOP &{Consumer} {\n${Consumer.StandardMeals}\n}\n"];

    assert_eq!(render_for(RUN_200, "alice", &posts_200), "2\n1\n");

    let run = DeliveryRun::from_toml(RUN_200).unwrap();
    let err = Generator::new(&run)
        .driver_message(&template(&posts_300), run.driver("alice").unwrap())
        .unwrap_err();
    assert_eq!(
        err.source,
        ResolveError::Unknown {
            kind: RefKind::Field,
            name: "Consumer.StandardMeals".into(),
            version: "2-0-0",
        }
    );

    let run_300 = with_version("3-0-0");
    assert_eq!(render_for(&run_300, "alice", &posts_300), "0\n0\n");
    let run = DeliveryRun::from_toml(&run_300).unwrap();
    assert!(
        Generator::new(&run)
            .driver_message(&template(&posts_200), run.driver("alice").unwrap())
            .is_err()
    );
}

#[test]
fn alternate_meal_types_per_pickup() {
    let run = r#"
[control]
version = "3-0-0"

[[drivers]]
user_name = "alice"

[[drivers.pickups]]
name = "Bopshop"

[[drivers.deliveries]]
name = "Bob"
restaurant = "Bopshop"
standard_meals = 2
alternate_meals = 1
alternate_meal_type = "veggie"

[[drivers.deliveries]]
name = "Carol"
restaurant = "Bopshop"
alternate_meals = 2
alternate_meal_type = "halal"
"#;
    let posts = [concat!(
        "[Pickup]\n",
        "LOOP &{Pickup} {\n",
        "${Pickup.Name}: ${Pickup.StandardMeals} standard\n",
        "LOOP &{AlternateMeals} {\n",
        "+ ${AlternateMeals.Count} ${AlternateMeals.Type}\n",
        "}\n",
        "}\n",
    )];
    assert_eq!(
        render_for(run, "alice", &posts),
        "Bopshop: 2 standard\n+ 1 veggie\n+ 2 halal\n"
    );
}

#[test]
fn unknown_reference_names_block_and_post() {
    let run = DeliveryRun::from_toml(RUN_200).unwrap();
    let template = template(&["[Comment]\nignored ${Nope}\n", "[Fine]\nok\n", "[Bad]\nhi ${Nope}\n"]);
    let err = Generator::new(&run)
        .driver_message(&template, run.driver("alice").unwrap())
        .unwrap_err();
    assert_eq!(err.block, "Bad");
    assert_eq!(err.post, 3);
    assert_eq!(err.span, 9..16);
    let message = err.to_string();
    assert!(message.contains("[Bad]") && message.contains("post 3") && message.contains("Nope"));
}

#[test]
fn unbalanced_template_renders_nothing() {
    let mut source = MemorySource::new();
    source.push("[Pickups]\nIF ${AnyCondo} THEN {\ncondo\n");
    match load_template(&source, &Parser::new()) {
        Err(LoadError::Parse(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].block.as_deref(), Some("Pickups"));
            assert_eq!(errors[0].post, 1);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn group_and_backup_messages() {
    let run = DeliveryRun::from_toml(RUN_200).unwrap();
    let generator = Generator::new(&run);

    let group = template(&["[Group]\nDrivers tonight:\n- ${Driver.UserName}\nBackup is ${BackupDriver}\n"]);
    assert_eq!(
        generator.group_instructions(&group).unwrap(),
        "Drivers tonight:\n- alice\n- dave\nBackup is zed\n"
    );

    let backup = template(&["[Backup]\nThanks ${BackupDriver.UserName}!\n"]);
    assert_eq!(generator.backup_driver_message(&backup).unwrap(), "Thanks zed!\n");
}

#[test]
fn file_source_reads_topic_files_and_post_directories() {
    let dir = tempfile::tempdir().unwrap();

    let topic = dir.path().join("topic.txt");
    std::fs::write(&topic, "-- post 1 --\n[A]\nHi ${Driver}\n-- post 2 --\n[B]\nBye\n").unwrap();
    let parsed = load_template(&FileSource::new(&topic), &Parser::new()).unwrap();
    let names: Vec<&str> = parsed.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);

    let posts = dir.path().join("posts");
    std::fs::create_dir(&posts).unwrap();
    std::fs::write(posts.join("10.txt"), "[Late]\nz\n").unwrap();
    std::fs::write(posts.join("2.txt"), "[Early]\na\n").unwrap();
    std::fs::write(posts.join("notes.md"), "ignored").unwrap();
    let parsed = load_template(&FileSource::new(&posts), &Parser::new()).unwrap();
    let order: Vec<(u32, &str)> = parsed.blocks.iter().map(|b| (b.post, b.name.as_str())).collect();
    assert_eq!(order, vec![(2, "Early"), (10, "Late")]);

    let missing = load_template(&FileSource::new(dir.path().join("nope.txt")), &Parser::new());
    assert!(matches!(missing, Err(LoadError::Io { .. })));
}
