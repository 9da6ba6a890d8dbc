//! Producing the messages of a delivery run.
//!
//! Every driver gets one message built from the driver template. The group
//! instructions and the backup-driver notice are rendered once each with no
//! driver bound. Passes share nothing but the immutable template and run, so
//! each message stands or fails on its own.

use msgtmpl::Template;
use tracing::{debug, info_span, warn};

use crate::error::RenderError;
use crate::render::Renderer;
use crate::run::{DeliveryRun, Driver};
use crate::scope::{Binding, ScopeId, Scopes};

/// One driver's rendered message, or why it could not be rendered.
#[derive(Debug)]
pub struct DriverMessage<'run> {
    pub driver: &'run Driver,
    pub message: Result<String, RenderError>,
}

#[derive(Debug, Clone, Copy)]
pub struct Generator<'run> {
    renderer: Renderer<'run>,
}

impl<'run> Generator<'run> {
    pub fn new(run: &'run DeliveryRun) -> Self {
        Generator {
            renderer: Renderer::new(run),
        }
    }

    pub fn renderer(&self) -> &Renderer<'run> {
        &self.renderer
    }

    /// Root scope carrying the run-wide bindings.
    fn root(&self, scopes: &mut Scopes<'run>, label: String) -> ScopeId {
        let root = scopes.root(label);
        if let Some(backup) = self.renderer.run().control.backup_drivers.first() {
            scopes.bind(root, Binding::BackupDriver(backup));
        }
        root
    }

    pub fn driver_message(
        &self,
        template: &Template,
        driver: &'run Driver,
    ) -> Result<String, RenderError> {
        let _span = info_span!("driver_message", driver = %driver.user_name).entered();
        let mut scopes = Scopes::new();
        let root = self.root(&mut scopes, format!("driver {}", driver.user_name));
        scopes.bind(root, Binding::Driver(driver));
        let message = self.renderer.render_template(template, &mut scopes, root)?;
        debug!(bytes = message.len(), "driver message rendered");
        Ok(message)
    }

    /// A message per driver, in run order. A failure is logged and kept with
    /// its driver; the other drivers are unaffected.
    pub fn driver_messages(&self, template: &Template) -> Vec<DriverMessage<'run>> {
        self.renderer
            .run()
            .drivers
            .iter()
            .map(|driver| {
                let message = self.driver_message(template, driver);
                if let Err(err) = &message {
                    warn!(driver = %driver.user_name, error = %err, "driver message failed");
                }
                DriverMessage { driver, message }
            })
            .collect()
    }

    pub fn group_instructions(&self, template: &Template) -> Result<String, RenderError> {
        let _span = info_span!("group_instructions").entered();
        self.run_wide(template, "group")
    }

    pub fn backup_driver_message(&self, template: &Template) -> Result<String, RenderError> {
        let _span = info_span!("backup_driver_message").entered();
        self.run_wide(template, "backup")
    }

    fn run_wide(&self, template: &Template, label: &str) -> Result<String, RenderError> {
        let mut scopes = Scopes::new();
        let root = self.root(&mut scopes, label.to_string());
        self.renderer.render_template(template, &mut scopes, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{ControlBlock, SchemaVersion};
    use msgtmpl::block::Post;
    use msgtmpl::parser::Parser;

    fn template(posts: &[(u32, &str)]) -> Template {
        let posts: Vec<Post> = posts.iter().map(|(n, raw)| Post::new(*n, *raw)).collect();
        Template::parse(&posts, &Parser::new()).unwrap()
    }

    #[test]
    fn blocks_concatenate_and_comments_are_skipped() {
        let mut run = DeliveryRun::new(ControlBlock::new(SchemaVersion::V200));
        run.drivers.push(Driver::new("alice"));
        let template = template(&[
            (1, "[Comment]\nnot sent\n"),
            (2, "[Hello]\nHi ${Driver}\n"),
            (3, "[Bye]\nbye\n"),
        ]);
        let generator = Generator::new(&run);
        let message = generator.driver_message(&template, &run.drivers[0]).unwrap();
        assert_eq!(message, "Hi alice\nbye\n");
    }

    #[test]
    fn one_failing_driver_does_not_stop_the_others() {
        let mut run = DeliveryRun::new(ControlBlock::new(SchemaVersion::V200));
        run.drivers.push(Driver::new("alice"));
        let mut bob = Driver::new("bob");
        bob.warnings.push("late start".to_string());
        run.drivers.push(bob);
        let template = template(&[(4, "[Warn]\nIF ${HasWarnings} THEN {\n${Nope}\n}\nok\n")]);

        let messages = Generator::new(&run).driver_messages(&template);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message.as_deref().ok(), Some("ok\n"));
        let err = messages[1].message.as_ref().unwrap_err();
        assert_eq!((err.block.as_str(), err.post), ("Warn", 4));
    }

    #[test]
    fn run_wide_messages_see_the_first_backup_driver() {
        let mut control = ControlBlock::new(SchemaVersion::V300);
        control.backup_drivers = vec!["zed".into(), "yan".into()];
        let run = DeliveryRun::new(control);
        let generator = Generator::new(&run);

        let notice = template(&[(1, "[Backup]\nBackup: ${BackupDriver}\n")]);
        assert_eq!(generator.backup_driver_message(&notice).unwrap(), "Backup: zed\n");

        let group = template(&[(1, "[Group]\nIF NOT ${HasBackupDriver} THEN {\nnone\n}\n${Driver}\n")]);
        let err = generator.group_instructions(&group).unwrap_err();
        assert!(matches!(err.source, crate::error::ResolveError::Unbound { .. }));
    }
}
