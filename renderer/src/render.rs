//! Walking a parsed block against a scope chain.

use std::ops::Range;

use msgtmpl::Template;
use msgtmpl::block::Block;
use msgtmpl::element::{self, Conditional, Element, FieldReference, Loop, Predicate};
use tracing::{debug, trace};

use crate::error::{RefKind, RenderError, ResolveError};
use crate::resolver::{Env, Item, Resolve, Resolver};
use crate::run::DeliveryRun;
use crate::scope::{ScopeId, Scopes};
use crate::value::Value;

/// Renders blocks for one delivery run.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'run> {
    run: &'run DeliveryRun,
    resolver: Resolver,
}

impl<'run> Renderer<'run> {
    pub fn new(run: &'run DeliveryRun) -> Self {
        Renderer {
            run,
            resolver: Resolver::for_run(run),
        }
    }

    pub fn run(&self) -> &'run DeliveryRun {
        self.run
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Render one block under `root`. Nothing is returned for a failed pass.
    pub fn render_block(
        &self,
        block: &Block,
        scopes: &mut Scopes<'run>,
        root: ScopeId,
    ) -> Result<String, RenderError> {
        debug!(block = %block.name, post = block.post, scope = %scopes.path(root), "rendering block");
        let mut pass = Pass {
            run: self.run,
            resolver: &self.resolver,
            scopes,
            loops: Vec::new(),
            out: String::new(),
        };
        match pass.sequence(&block.body, root) {
            Ok(_) => Ok(pass.out),
            Err(fault) => Err(RenderError {
                block: block.name.clone(),
                post: block.post,
                span: fault.span,
                source: fault.error,
            }),
        }
    }

    /// Every renderable block in post order, concatenated.
    pub fn render_template(
        &self,
        template: &Template,
        scopes: &mut Scopes<'run>,
        root: ScopeId,
    ) -> Result<String, RenderError> {
        let mut message = String::new();
        for block in template.renderable() {
            message.push_str(&self.render_block(block, scopes, root)?);
        }
        Ok(message)
    }
}

/// Whether the enclosing loop iteration goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Continue,
}

/// A resolution failure and where in the post it happened.
struct Fault {
    error: ResolveError,
    span: Range<usize>,
}

trait AtSpan<T> {
    fn at(self, span: &Range<usize>) -> Result<T, Fault>;
}

impl<T> AtSpan<T> for Result<T, ResolveError> {
    fn at(self, span: &Range<usize>) -> Result<T, Fault> {
        self.map_err(|error| Fault {
            error,
            span: span.clone(),
        })
    }
}

/// State of one rendering pass over one block.
struct Pass<'p, 'run> {
    run: &'run DeliveryRun,
    resolver: &'p Resolver,
    scopes: &'p mut Scopes<'run>,
    /// Lists of the enclosing loops and repeated lines, innermost last.
    loops: Vec<String>,
    out: String,
}

impl<'run> Pass<'_, 'run> {
    fn env(&self, at: ScopeId) -> Env<'_, 'run> {
        Env::new(self.run, &*self.scopes, at)
    }

    /// Outside any loop a sequence is taken line by line, repeating lines that
    /// carry a `LIST.FIELD` placeholder.
    fn sequence(&mut self, elements: &[Element], at: ScopeId) -> Result<Flow, Fault> {
        if !self.loops.is_empty() {
            return self.elements(elements, at);
        }
        for line in element::lines(elements) {
            let flow = match element::repetition_list(line) {
                Some(list) => self.repeat_line(list, line, at)?,
                None => self.elements(line, at)?,
            };
            if flow == Flow::Continue {
                return Ok(Flow::Continue);
            }
        }
        Ok(Flow::Normal)
    }

    fn elements(&mut self, elements: &[Element], at: ScopeId) -> Result<Flow, Fault> {
        for element in elements {
            match element {
                Element::Text(text) => self.out.push_str(text),
                Element::SimpleRef(_)
                | Element::ListNameRef(_)
                | Element::StructRef(_)
                | Element::ListRef(_) => {
                    let value = self.value(element, RefKind::Scalar, at)?;
                    self.emit(&value);
                }
                Element::QuotedString(_) => {}
                Element::Conditional(conditional) => {
                    if self.conditional(conditional, at)? == Flow::Continue {
                        return Ok(Flow::Continue);
                    }
                }
                Element::Loop(l) => self.repeat(l, at)?,
                Element::Continue(_) => return Ok(Flow::Continue),
            }
        }
        Ok(Flow::Normal)
    }

    fn emit(&mut self, value: &Value<'_>) {
        match value {
            Value::Text(text) => self.out.push_str(text),
            other => self.out.push_str(&other.to_string()),
        }
    }

    /// Resolve a reference element. `kind` names what the template wanted,
    /// for errors on bare names.
    fn value(&self, element: &Element, kind: RefKind, at: ScopeId) -> Result<Value<'run>, Fault> {
        let env = self.env(at);
        match element {
            Element::SimpleRef(r) => self.resolver.simple(&r.name, kind, &env).at(&r.span),
            Element::ListNameRef(r) => {
                self.resolver.simple(&r.name, RefKind::Collection, &env).at(&r.span)
            }
            Element::StructRef(r) => self.resolver.structure(&r.list, &r.field, &env).at(&r.span),
            Element::ListRef(r) => {
                let list = self.list_for(r).at(&r.span)?;
                self.resolver.field(list, &r.field, &env).at(&r.span)
            }
            Element::QuotedString(s) => Ok(Value::owned(s.clone())),
            Element::Text(t) => Ok(Value::owned(t.clone())),
            Element::Conditional(_) | Element::Loop(_) | Element::Continue(_) => Ok(Value::text("")),
        }
    }

    /// The collection a `LIST.FIELD` reads from. A known collection is read
    /// from its own binding, whichever loop is innermost. Any other name must
    /// abbreviate an enclosing loop's list, so `C.NAME` works inside
    /// `LOOP &{Consumer}`.
    fn list_for<'r>(&'r self, reference: &'r FieldReference) -> Result<&'r str, ResolveError> {
        let name = || format!("{}.{}", reference.list, reference.field);
        if self.loops.is_empty() {
            return Err(ResolveError::OutsideLoop { name: name() });
        }
        if self.resolver.is_collection(&reference.list)
            || self.loops.iter().any(|list| reference.is_over(list))
        {
            return Ok(&reference.list);
        }
        self.loops
            .iter()
            .rev()
            .find(|list| abbreviates(&reference.list, list))
            .map(String::as_str)
            .ok_or_else(|| self.resolver.unknown(RefKind::Field, name()))
    }

    fn conditional(&mut self, conditional: &Conditional, at: ScopeId) -> Result<Flow, Fault> {
        let holds = match &conditional.predicate {
            Predicate::Test(subject) => self.value(subject, RefKind::Predicate, at)?.is_truthy(),
            Predicate::Equals { subject, operand } => {
                let operand = self.value(operand, RefKind::Scalar, at)?.to_string();
                self.value(subject, RefKind::Scalar, at)?.matches(&operand)
            }
        };
        trace!(polarity = conditional.polarity, holds, "conditional");
        if holds == conditional.polarity {
            self.sequence(&conditional.body, at)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn items(&self, list: &str, span: &Range<usize>, at: ScopeId) -> Result<Vec<Item<'run>>, Fault> {
        self.resolver.collection(list, &self.env(at)).at(span)
    }

    /// `LOOP &{List} { body }`. CONTINUE ends the iteration, keeping what it
    /// already produced.
    fn repeat(&mut self, l: &Loop, at: ScopeId) -> Result<(), Fault> {
        let items = self.items(&l.list.name, &l.list.span, at)?;
        trace!(list = %l.list.name, count = items.len(), scope = %self.scopes.path(at), "loop");
        for (index, item) in items.into_iter().enumerate() {
            let child = self.enter(&l.list.name, index, item, at);
            let result = self.sequence(&l.body, child);
            self.leave(child);
            result?;
        }
        Ok(())
    }

    /// A line outside any loop, once per element of the list its placeholder
    /// names. Every copy ends with a newline; an empty list yields nothing.
    fn repeat_line(
        &mut self,
        list: &FieldReference,
        line: &[Element],
        at: ScopeId,
    ) -> Result<Flow, Fault> {
        let items = self.items(&list.list, &list.span, at)?;
        trace!(list = %list.list, count = items.len(), "repeated line");
        for (index, item) in items.into_iter().enumerate() {
            let child = self.enter(&list.list, index, item, at);
            let start = self.out.len();
            let result = self.elements(line, child);
            self.leave(child);
            result?;
            if !self.out[start..].ends_with('\n') {
                self.out.push('\n');
            }
        }
        Ok(Flow::Normal)
    }

    fn enter(&mut self, list: &str, index: usize, item: Item<'run>, at: ScopeId) -> ScopeId {
        let child = self.scopes.child(at, format!("{}[{}]", list, index));
        for binding in item {
            self.scopes.bind(child, binding);
        }
        self.loops.push(list.to_string());
        child
    }

    fn leave(&mut self, child: ScopeId) {
        self.loops.pop();
        self.scopes.release(child);
    }
}

/// `alias` is a leading part of `list`, ignoring ASCII case.
fn abbreviates(alias: &str, list: &str) -> bool {
    list.get(..alias.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{ControlBlock, Delivery, Driver, Restaurant, SchemaVersion};
    use crate::scope::Binding;
    use msgtmpl::block::Post;
    use msgtmpl::parser::Parser;
    use pretty_assertions::assert_eq;

    fn run() -> DeliveryRun {
        let mut run = DeliveryRun::new(ControlBlock::new(SchemaVersion::V200));
        let mut alice = Driver::new("alice");
        alice.pickups.push(Restaurant::new("A"));
        for (name, address) in [("Bob", "1 Main St"), ("Carol", "2 Oak St")] {
            let mut d = Delivery::new(name, "A");
            d.address = address.to_string();
            alice.deliveries.push(d);
        }
        run.drivers.push(alice);
        run
    }

    fn render(run: &DeliveryRun, raw: &str) -> Result<String, RenderError> {
        let block = Parser::new().parse_block(&Post::new(1, raw)).unwrap();
        let mut scopes = Scopes::new();
        let root = scopes.root("driver alice");
        scopes.bind(root, Binding::Driver(&run.drivers[0]));
        Renderer::new(run).render_block(&block, &mut scopes, root)
    }

    #[test]
    fn loop_with_aliased_list() {
        let run = run();
        let out = render(
            &run,
            "[Base]\nHello ${DRIVER}\nLOOP &{Consumer} {\n- ${C.NAME} at ${C.ADDRESS}\n}\n",
        )
        .unwrap();
        assert_eq!(out, "Hello alice\n- Bob at 1 Main St\n- Carol at 2 Oak St\n");
    }

    #[test]
    fn unlooped_line_repeats_per_element() {
        let run = run();
        let out = render(&run, "[A]\ntop\n* ${Consumer.Name}\nend").unwrap();
        assert_eq!(out, "top\n* Bob\n* Carol\nend");

        let out = render(&run, "[A]\n${Consumer.Name}").unwrap();
        assert_eq!(out, "Bob\nCarol\n");
    }

    #[test]
    fn continue_keeps_partial_iteration() {
        let run = run();
        let src = "[A]\nLOOP &{Consumer} {\n<${Consumer.Name}>IF ${Consumer.Name} == \"bob\" THEN {\nCONTINUE\n}\n!\n}\n";
        let out = render(&run, src).unwrap();
        assert_eq!(out, "<Bob><Carol>!\n");
    }

    #[test]
    fn list_field_outside_any_loop_in_a_predicate() {
        let run = run();
        let err = render(&run, "[Cond]\nIF &{Consumer.IsCondo} THEN {\nx\n}\n").unwrap_err();
        assert_eq!(err.block, "Cond");
        assert!(matches!(err.source, ResolveError::OutsideLoop { .. }));
    }

    #[test]
    fn collection_fields_read_their_own_binding() {
        let run = run();
        let err = render(&run, "[A]\nLOOP &{Pickup} {\nfirst consumer: ${Consumer.Name}\n}\n")
            .unwrap_err();
        assert_eq!(
            err.source,
            ResolveError::Unbound {
                name: "Consumer.Name".into(),
                binding: "delivery",
            }
        );

        let err = render(&run, "[A]\nLOOP &{Consumer} {\n${Pickup.Name}\n}\n").unwrap_err();
        assert!(matches!(err.source, ResolveError::Unbound { .. }));

        let out = render(&run, "[A]\nLOOP &{Pickup} {\nLOOP &{Consumer} {\n${P.Name}: ${C.Name}\n}\n}\n")
            .unwrap();
        assert_eq!(out, "A: Bob\nA: Carol\n");
    }

    #[test]
    fn unknown_list_inside_a_loop() {
        let run = run();
        let err = render(&run, "[A]\nLOOP &{Consumer} {\n${Bogus.Name}\n}\n").unwrap_err();
        assert_eq!(
            err.source,
            ResolveError::Unknown {
                kind: RefKind::Field,
                name: "Bogus.Name".into(),
                version: "2-0-0",
            }
        );
    }

    #[test]
    fn inline_conditional_repeats_the_whole_line() {
        let run = run();
        let out = render(&run, "[A]\nNote IF NOT ${AnyCondo} THEN {${Consumer.Name}} end\n").unwrap();
        assert_eq!(out, "Note Bob end\nNote Carol end\n");
    }

    #[test]
    fn bare_collection_name_is_its_size() {
        let run = run();
        let out = render(&run, "[A]\n${Consumer} stops\nIF ${Pickup} THEN {has pickups}\n").unwrap();
        assert_eq!(out, "2 stops\nhas pickups\n");
    }

    #[test]
    fn scope_is_released_after_each_iteration() {
        let run = run();
        let block = Parser::new()
            .parse_block(&Post::new(1, "[A]\nLOOP &{Consumer} {\n${Consumer.Name}\n}\n"))
            .unwrap();
        let mut scopes = Scopes::new();
        let root = scopes.root("driver alice");
        scopes.bind(root, Binding::Driver(&run.drivers[0]));
        let renderer = Renderer::new(&run);
        renderer.render_block(&block, &mut scopes, root).unwrap();
        assert!(scopes.delivery(root).is_none());
        assert_eq!(scopes.path(root), "driver alice");
        let again = scopes.child(root, "retry");
        assert_eq!(scopes.path(again), "driver alice/retry");
    }
}
