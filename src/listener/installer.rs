use std::fmt;
use std::rc::Rc;

use serde_json::json;

use crate::cleanup::{
    DisposalMode, ListenerTarget, TemplateCleanupEntry, ViewCleanup, ViewCleanupEntry,
};
use crate::error::{ListenerError, Result};
use crate::event::Handler;
use crate::logging::{LogLevel, json_kv};
use crate::output::{Directive, OutputAliases, collect_output_aliases};
use crate::renderer::{EventTarget, Renderer, ResolvedTarget, TargetResolver};
use crate::view::{FirstPassState, TNode, View, ViewFlags};

use super::coalesce::CoalescedListener;
use super::wrapper::ListenerWrapper;

/// Picks the renderer for listeners that must run under another view's renderer.
pub type RendererLoader = Rc<dyn Fn(&TNode, &View) -> Renderer>;

#[derive(Clone, Default)]
pub struct ListenOptions {
    pub use_capture: bool,
    pub target_resolver: Option<TargetResolver>,
    pub renderer_loader: Option<RendererLoader>,
}

impl ListenOptions {
    pub fn capture(mut self, use_capture: bool) -> Self {
        self.use_capture = use_capture;
        self
    }

    pub fn target(mut self, resolver: TargetResolver) -> Self {
        self.target_resolver = Some(resolver);
        self
    }

    pub fn renderer(mut self, loader: RendererLoader) -> Self {
        self.renderer_loader = Some(loader);
        self
    }
}

impl fmt::Debug for ListenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenOptions")
            .field("use_capture", &self.use_capture)
            .field("target_resolver", &self.target_resolver.is_some())
            .field("renderer_loader", &self.renderer_loader.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOutcome {
    /// A new native subscription was made.
    Subscribed,
    /// The handler joined an existing subscription's chain.
    Coalesced,
    /// The node cannot carry native listeners.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenOutcome {
    pub native: NativeOutcome,
    /// Output subscriptions made for this event name.
    pub outputs: usize,
}

/// Scoped construction pass over one view.
///
/// Holds the view mutably for the whole pass, replacing ambient
/// "current view" state. The first pass of a template also records the
/// template cleanup log; later passes are checked against it.
pub struct CreationPass<'v> {
    view: &'v mut View,
    first_pass: bool,
    cursor: usize,
    finished: bool,
}

impl<'v> CreationPass<'v> {
    pub(crate) fn start(view: &'v mut View) -> Result<Self> {
        if view.is_destroyed() {
            return Err(ListenerError::ViewDestroyed(view.id));
        }
        // Slots are positions in the view log, so a pass must start from an empty one.
        if view.cleanup.as_ref().is_some_and(|cleanup| !cleanup.is_empty()) {
            return Err(ListenerError::CreationRepeated(view.id));
        }

        let template = &view.template;
        let first_pass = match template.first_pass_state() {
            FirstPassState::Pending => {
                template.set_first_pass_state(FirstPassState::Running);
                true
            }
            FirstPassState::Running => {
                return Err(ListenerError::ReentrantFirstPass(template.name().to_string()));
            }
            FirstPassState::Complete => false,
        };

        view.flags.set(view.flags.get() | ViewFlags::CREATION_MODE);
        Ok(Self {
            view,
            first_pass,
            cursor: 0,
            finished: false,
        })
    }

    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    pub fn view(&self) -> &View {
        self.view
    }

    /// Bind `handler` to `event_name` on the node at `node_index`.
    pub fn listen(
        &mut self,
        node_index: usize,
        event_name: &str,
        handler: Handler,
        options: ListenOptions,
    ) -> Result<ListenOutcome> {
        let template = Rc::clone(&self.view.template);
        let tnode = template
            .node(node_index)
            .ok_or_else(|| ListenerError::UnknownNode {
                index: node_index,
                template: template.name().to_string(),
            })?;

        let mut outcome = ListenOutcome {
            native: NativeOutcome::Skipped,
            outputs: 0,
        };

        if tnode.kind.is_element_like() {
            outcome.native = self.listen_native(tnode, event_name, &handler, &options)?;
        }

        // A coalesced handler shares the head's install; its outputs were
        // already processed there.
        if outcome.native != NativeOutcome::Coalesced {
            outcome.outputs = self.subscribe_outputs(tnode, event_name, &handler)?;
        }
        Ok(outcome)
    }

    /// Register an action to run when the view is destroyed.
    pub fn on_destroy(&mut self, hook: impl FnOnce() + 'static) -> Result<()> {
        self.record(ViewCleanupEntry::DestroyHook(Box::new(hook)), |slot| {
            TemplateCleanupEntry::DestroyHook { slot }
        })?;
        Ok(())
    }

    /// Close the pass. Completing a first pass freezes the template log.
    pub fn finish(mut self) {
        if self.first_pass {
            self.view
                .template
                .set_first_pass_state(FirstPassState::Complete);
        }
        self.finished = true;
    }

    fn listen_native(
        &mut self,
        tnode: &TNode,
        event_name: &str,
        handler: &Handler,
        options: &ListenOptions,
    ) -> Result<NativeOutcome> {
        let view = &*self.view;
        let native = view
            .native(tnode.index)
            .ok_or(ListenerError::MissingNative(tnode.index))?;
        let resolved = match &options.target_resolver {
            Some(resolve) => resolve(&native),
            None => ResolvedTarget {
                target: EventTarget::Node(native),
                name: None,
            },
        };
        let renderer = match &options.renderer_loader {
            Some(load) => load(tnode, view),
            None => view.renderer.clone(),
        };

        if options.target_resolver.is_none() && renderer.is_procedural() {
            if let Some(chain) = self.existing_listener(event_name, tnode.index) {
                chain.prepend(Rc::clone(handler));
                view.config.record(|metrics| metrics.record_coalesced());
                view.config.log(
                    LogLevel::Debug,
                    "listener_coalesced",
                    [
                        json_kv("view", json!(view.id.0)),
                        json_kv("node", json!(tnode.index)),
                        json_kv("event", json!(event_name)),
                        json_kv("handlers", json!(chain.len())),
                    ],
                );
                return Ok(NativeOutcome::Coalesced);
            }
        }

        let dirty_view = if tnode.component_host {
            view.component_view(tnode.index)
                .ok_or(ListenerError::MissingComponentView(tnode.index))?
        } else {
            view.id
        };

        let chain = Rc::new(CoalescedListener::new(Rc::clone(handler)));
        let wrapper = ListenerWrapper::new(
            Rc::clone(&chain),
            dirty_view,
            view.id,
            Rc::clone(&view.flags),
            Rc::clone(&view.host),
            !renderer.is_procedural(),
            view.config.clone(),
        );
        let binding = renderer.bind(
            &resolved,
            event_name,
            wrapper.into_callback(),
            options.use_capture,
        );

        view.config.record(|metrics| metrics.record_native_subscription());
        view.config.log(
            LogLevel::Debug,
            "listener_installed",
            [
                json_kv("view", json!(view.id.0)),
                json_kv("node", json!(tnode.index)),
                json_kv("event", json!(event_name)),
                json_kv("target", json!(resolved.target.to_string())),
                json_kv("procedural", json!(renderer.is_procedural())),
            ],
        );

        let mode = if renderer.is_procedural() {
            DisposalMode::Disposer
        } else {
            DisposalMode::Capture(options.use_capture)
        };
        let target = match &options.target_resolver {
            Some(resolver) => ListenerTarget::Resolver {
                node: tnode.index,
                resolver: Rc::clone(resolver),
            },
            None => ListenerTarget::Node(tnode.index),
        };

        let entry = ViewCleanupEntry::Listener {
            listener: chain,
            binding,
            target: resolved.target,
            event: event_name.to_string(),
            capture: options.use_capture,
        };
        self.record(entry, |slot| TemplateCleanupEntry::Listener {
            event: event_name.to_string(),
            target,
            slot,
            mode,
        })?;
        Ok(NativeOutcome::Subscribed)
    }

    fn subscribe_outputs(
        &mut self,
        tnode: &TNode,
        event_name: &str,
        handler: &Handler,
    ) -> Result<usize> {
        let aliases = node_outputs(tnode, &self.view.directives)?;
        let Some(bound) = aliases.get(event_name) else {
            return Ok(0);
        };

        for alias in bound {
            let directive = self
                .view
                .directive(alias.directive)
                .cloned()
                .ok_or(ListenerError::UnknownDirective(alias.directive))?;
            let stream = directive.output(&alias.property).ok_or_else(|| {
                ListenerError::MisconfiguredOutput {
                    property: alias.property.clone(),
                    owner: directive.def().type_name.clone(),
                }
            })?;
            let subscription = stream.subscribe(Rc::clone(handler));

            let config = &self.view.config;
            config.record(|metrics| metrics.record_output_subscription());
            config.log(
                LogLevel::Debug,
                "output_subscribed",
                [
                    json_kv("view", json!(self.view.id.0)),
                    json_kv("node", json!(tnode.index)),
                    json_kv("event", json!(event_name)),
                    json_kv("directive", json!(directive.def().type_name)),
                    json_kv("property", json!(alias.property)),
                ],
            );

            self.record(ViewCleanupEntry::Output { subscription }, |slot| {
                TemplateCleanupEntry::Output {
                    event: event_name.to_string(),
                    node: tnode.index,
                    slot,
                }
            })?;
        }
        Ok(bound.len())
    }

    fn existing_listener(&self, event_name: &str, node: usize) -> Option<Rc<CoalescedListener>> {
        let slot = self.view.template.cleanup().find_listener(event_name, node)?;
        self.view.cleanup.as_ref()?.listener_at(slot)
    }

    /// Append a view entry and record or verify its template counterpart.
    ///
    /// The view entry is kept even on a layout mismatch so teardown still
    /// releases it.
    fn record(
        &mut self,
        entry: ViewCleanupEntry,
        describe: impl FnOnce(usize) -> TemplateCleanupEntry,
    ) -> Result<usize> {
        let slot = self
            .view
            .cleanup
            .get_or_insert_with(ViewCleanup::new)
            .push(entry);
        let expected = describe(slot);
        let template = &self.view.template;

        if self.first_pass {
            template.cleanup_mut().push(expected);
        } else {
            let cleanup = template.cleanup();
            let matches = cleanup
                .get(self.cursor)
                .is_some_and(|recorded| recorded.same_layout(&expected));
            if !matches {
                return Err(ListenerError::CleanupMismatch {
                    template: template.name().to_string(),
                    slot,
                });
            }
        }
        self.cursor += 1;
        Ok(slot)
    }
}

impl Drop for CreationPass<'_> {
    fn drop(&mut self) {
        let flags = self.view.flags.get();
        self.view.flags.set(flags - ViewFlags::CREATION_MODE);

        if self.finished {
            return;
        }

        // An abandoned pass releases what it subscribed and leaves no partial log behind.
        if let Some(mut partial) = self.view.cleanup.take() {
            let released = partial.run_all();
            self.view
                .config
                .record(|metrics| metrics.record_disposals(released));
        }
        if self.first_pass {
            let template = &self.view.template;
            template.cleanup_mut().clear();
            template.set_first_pass_state(FirstPassState::Pending);
        }
    }
}

/// Output aliases for `tnode`, computed on first use and cached on the node.
fn node_outputs<'t>(
    tnode: &'t TNode,
    directives: &[Rc<dyn Directive>],
) -> Result<&'t OutputAliases> {
    if let Some(cached) = tnode.cached_outputs() {
        return Ok(cached);
    }
    let mut defs = Vec::with_capacity(tnode.directives.len());
    for &index in &tnode.directives {
        let directive = directives
            .get(index)
            .ok_or(ListenerError::UnknownDirective(index))?;
        defs.push((index, directive.def()));
    }
    Ok(tnode.cache_outputs(collect_output_aliases(defs)))
}
