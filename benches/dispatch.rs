use std::hint::black_box;
use std::rc::Rc;

use criterion::{Criterion, criterion_group, criterion_main};
use room_listen::harness::RecordingRenderer;
use room_listen::logging::{LogEvent, LogSink};
use room_listen::{
    Event, EventTarget, HandlerFailure, ListenOptions, ListenerConfig, Logger, LoggingResult,
    NativeNode, Renderer, TNode, TemplateDescriptor, View, ViewHost, ViewId, handler,
};
use serde_json::Value;

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

struct NullHost;

impl ViewHost for NullHost {
    fn mark_view_dirty(&self, view: ViewId) {
        black_box(view);
    }

    fn handle_error(&self, _view: ViewId, _error: &HandlerFailure) {}
}

const NODES: usize = 16;
const HANDLERS_PER_NODE: usize = 4;

fn form_template() -> Rc<TemplateDescriptor> {
    TemplateDescriptor::new("form", (0..NODES).map(TNode::element))
}

fn build_view(
    id: u64,
    template: &Rc<TemplateDescriptor>,
    renderer: &RecordingRenderer,
    host: &Rc<dyn ViewHost>,
    config: ListenerConfig,
) -> View {
    let mut view = View::new(
        ViewId(id),
        Rc::clone(template),
        Renderer::procedural(renderer.clone()),
        Rc::clone(host),
    )
    .with_config(config);
    for index in 0..NODES {
        view = view.with_native(index, NativeNode(index as u64));
    }
    view
}

fn install(view: &mut View) {
    let mut pass = view.begin_creation().expect("creation pass");
    for node in 0..NODES {
        for _ in 0..HANDLERS_PER_NODE {
            pass.listen(
                node,
                "click",
                handler(|_| Ok(Value::Null)),
                ListenOptions::default(),
            )
            .expect("listen");
        }
    }
    pass.finish();
}

fn quiet_config() -> ListenerConfig {
    let mut config = ListenerConfig::default().with_logger(Logger::new(NullSink));
    config.enable_metrics();
    config
}

fn install_and_destroy(c: &mut Criterion) {
    let template = form_template();
    let renderer = RecordingRenderer::new();
    let host: Rc<dyn ViewHost> = Rc::new(NullHost);
    // Prime the template so iterations measure instance passes.
    install(&mut build_view(0, &template, &renderer, &host, quiet_config()));

    let mut next_id = 1;
    c.bench_function("listener_install_and_destroy", |b| {
        b.iter(|| {
            let mut view = build_view(next_id, &template, &renderer, &host, quiet_config());
            next_id += 1;
            install(&mut view);
            black_box(view.destroy());
        });
    });
}

fn coalesced_dispatch(c: &mut Criterion) {
    let template = form_template();
    let renderer = RecordingRenderer::new();
    let host: Rc<dyn ViewHost> = Rc::new(NullHost);
    let mut view = build_view(1, &template, &renderer, &host, quiet_config());
    install(&mut view);
    let target = EventTarget::Node(NativeNode(3));

    c.bench_function("coalesced_dispatch", |b| {
        b.iter(|| {
            let mut event = Event::new("click");
            black_box(renderer.dispatch(&target, &mut event));
        });
    });
}

criterion_group!(benches, install_and_destroy, coalesced_dispatch);
criterion_main!(benches);
