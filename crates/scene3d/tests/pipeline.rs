mod support;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use proptest::prelude::*;
use scene3d::{
    standard_pipeline, BloomSettings, FrameEvent, Pipeline, PipelineError, ViewportPass,
};
use scene3d_core::{Color, GraphicsError, Rect, Size};

use support::{software_context, NodePass, RunLog};

fn log() -> RunLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Builds nodes `0..n` with the given `(producer, consumer)` edges.
fn build(n: usize, edges: &[(usize, usize)], log: &RunLog) -> Pipeline {
    let mut pipeline = Pipeline::new();
    for id in 0..n {
        let inputs = edges.iter().filter(|(_, c)| *c == id).count();
        pipeline.add_pass(NodePass::new(id, inputs, log)).unwrap();
    }
    let mut next_input = vec![0usize; n];
    for &(p, c) in edges {
        let port = NodePass::INPUTS[next_input[c]].name();
        next_input[c] += 1;
        pipeline.connect_named(p, "out", c, port).unwrap();
    }
    pipeline
}

prop_compose! {
    /// A random DAG: edges only go from lower to higher rank, ranks are a
    /// random permutation of insertion indices.
    fn dag()(n in 1usize..10)
        (rank in Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
         pairs in proptest::collection::vec((0..n, 0..n), 0..24),
         n in Just(n))
        -> (usize, Vec<(usize, usize)>)
    {
        let mut edges = BTreeSet::new();
        let mut fan_in = vec![0usize; n];
        for (a, b) in pairs {
            if a == b {
                continue;
            }
            let (p, c) = if rank[a] < rank[b] { (a, b) } else { (b, a) };
            if fan_in[c] < NodePass::INPUTS.len() && edges.insert((p, c)) {
                fan_in[c] += 1;
            }
        }
        (n, edges.into_iter().collect())
    }
}

proptest! {
    #[test]
    fn every_pass_runs_after_its_producers((n, edges) in dag()) {
        let mut gc = software_context(4, 4);
        let log = log();
        let mut pipeline = build(n, &edges, &log);
        pipeline.freeze().unwrap();
        pipeline.execute(&mut gc, []).unwrap();

        let ran = log.borrow().clone();
        prop_assert_eq!(ran.len(), n);
        let position = |id: usize| ran.iter().position(|&r| r == id).unwrap();
        for &(p, c) in &edges {
            prop_assert!(position(p) < position(c), "{} ran after {}", p, c);
        }
        prop_assert_eq!(pipeline.order().unwrap(), &ran[..]);
    }
}

#[test]
fn independent_passes_keep_insertion_order() {
    let log = log();
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(NodePass::new(0, 1, &log)).unwrap();
    pipeline.add_pass(NodePass::new(1, 0, &log)).unwrap();
    pipeline.add_pass(NodePass::new(2, 0, &log)).unwrap();
    pipeline.connect_named(2, "out", 0, "in0").unwrap();
    pipeline.freeze().unwrap();
    assert_eq!(pipeline.order().unwrap(), &[1, 2, 0]);

    let mut gc = software_context(4, 4);
    pipeline.execute(&mut gc, []).unwrap();
    pipeline.execute(&mut gc, []).unwrap();
    assert_eq!(*log.borrow(), vec![1, 2, 0, 1, 2, 0]);
}

#[test]
fn cycles_are_rejected_and_never_execute() {
    let log = log();
    let mut pipeline = Pipeline::new();
    let a = pipeline.add_pass(NodePass::new(0, 1, &log)).unwrap();
    let b = pipeline.add_pass(NodePass::new(1, 1, &log)).unwrap();
    pipeline
        .connect(a.output(NodePass::OUT), b.input(NodePass::INPUTS[0]))
        .unwrap();
    pipeline
        .connect(b.output(NodePass::OUT), a.input(NodePass::INPUTS[0]))
        .unwrap();

    match pipeline.freeze() {
        Err(PipelineError::CycleDetected { passes }) => {
            assert_eq!(passes, vec!["node0".to_owned(), "node1".to_owned()]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert!(!pipeline.is_frozen());

    let mut gc = software_context(4, 4);
    assert!(matches!(
        pipeline.execute(&mut gc, []),
        Err(PipelineError::NotFrozen)
    ));
    assert!(log.borrow().is_empty());
}

#[test]
fn mismatched_types_leave_wiring_unchanged() {
    let log = log();
    let mut pipeline = Pipeline::new();
    let viewport = pipeline.add_pass(ViewportPass::new()).unwrap();
    let producer = pipeline.add_pass(NodePass::new(1, 0, &log)).unwrap();
    let consumer = pipeline.add_pass(NodePass::new(2, 1, &log)).unwrap();

    let err = pipeline
        .connect_named(viewport.index(), "viewport", consumer.index(), "in0")
        .unwrap_err();
    assert!(matches!(err, PipelineError::TypeMismatch { .. }));

    // The failed attempt did not bind the input.
    pipeline
        .connect(producer.output(NodePass::OUT), consumer.input(NodePass::INPUTS[0]))
        .unwrap();
    pipeline.freeze().unwrap();
}

#[test]
fn inputs_bind_once() {
    let log = log();
    let mut pipeline = Pipeline::new();
    let a = pipeline.add_pass(NodePass::new(0, 0, &log)).unwrap();
    let b = pipeline.add_pass(NodePass::new(1, 1, &log)).unwrap();
    let port = b.input(NodePass::INPUTS[0]);
    pipeline.connect(a.output(NodePass::OUT), port).unwrap();
    assert!(matches!(
        pipeline.connect(a.output(NodePass::OUT), port),
        Err(PipelineError::AlreadyBound { port: "in0", .. })
    ));
    assert!(matches!(
        pipeline.connect_named(0, "missing", 1, "in0"),
        Err(PipelineError::UnknownPort { .. })
    ));
    assert!(matches!(
        pipeline.connect_named(7, "out", 1, "in0"),
        Err(PipelineError::UnknownPass(7))
    ));
}

#[test]
fn unbound_required_inputs_fail_at_freeze() {
    let log = log();
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(NodePass::new(0, 2, &log)).unwrap();
    pipeline.add_pass(NodePass::new(1, 0, &log)).unwrap();
    pipeline.connect_named(1, "out", 0, "in0").unwrap();
    match pipeline.freeze() {
        Err(PipelineError::UnboundPort { pass, port }) => {
            assert_eq!(pass, "node0");
            assert_eq!(port, "in1");
        }
        other => panic!("expected an unbound port, got {other:?}"),
    }
}

#[test]
fn reads_before_execute_are_stale() {
    let log = log();
    let mut pipeline = Pipeline::new();
    let a = pipeline.add_pass(NodePass::new(0, 0, &log)).unwrap();
    let b = pipeline.add_pass(NodePass::new(1, 1, &log)).unwrap();
    let out = a.output(NodePass::OUT);
    let input = b.input(NodePass::INPUTS[0]);
    pipeline.connect(out, input).unwrap();
    pipeline.freeze().unwrap();

    assert!(matches!(
        pipeline.read_output(out),
        Err(PipelineError::StaleData { .. })
    ));
    assert!(matches!(
        pipeline.read_input(input),
        Err(PipelineError::StaleData { port: "in0", .. })
    ));

    let mut gc = software_context(4, 4);
    pipeline.execute(&mut gc, []).unwrap();
    assert_eq!(pipeline.read_output(out).unwrap(), 1);
    assert_eq!(pipeline.read_input(input).unwrap(), 1);
    assert_eq!(pipeline.read_output(b.output(NodePass::OUT)).unwrap(), 2);
}

#[test]
fn frozen_pipelines_reject_changes() {
    let log = log();
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(NodePass::new(0, 0, &log)).unwrap();
    pipeline.add_pass(NodePass::new(1, 0, &log)).unwrap();
    pipeline.freeze().unwrap();
    assert!(matches!(
        pipeline.connect_named(0, "out", 1, "in0"),
        Err(PipelineError::PipelineFrozen)
    ));
    assert!(matches!(
        pipeline.add_pass(NodePass::new(2, 0, &log)),
        Err(PipelineError::PipelineFrozen)
    ));
    assert_eq!(pipeline.len(), 2);
}

#[test]
fn passes_must_write_their_outputs() {
    let log = log();
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(NodePass::new(0, 0, &log).silent()).unwrap();
    pipeline.add_pass(NodePass::new(1, 1, &log)).unwrap();
    pipeline.connect_named(0, "out", 1, "in0").unwrap();
    pipeline.freeze().unwrap();

    let mut gc = software_context(4, 4);
    assert!(matches!(
        pipeline.execute(&mut gc, []),
        Err(PipelineError::OutputNotProduced { port: "out", .. })
    ));
    // The frame was abandoned before the consumer ran.
    assert_eq!(*log.borrow(), vec![0]);
}

#[test]
fn resize_events_are_drained_at_frame_start() {
    let mut gc = software_context(4, 4);
    let mut pipeline = Pipeline::new();
    let viewport = pipeline.add_pass(ViewportPass::new()).unwrap();
    pipeline.freeze().unwrap();

    let events = [
        FrameEvent::Resized(Size::new(8, 8)),
        FrameEvent::Resized(Size::new(16, 12)),
    ];
    pipeline.execute(&mut gc, events).unwrap();
    assert_eq!(gc.viewport(), Size::new(16, 12));
    assert_eq!(
        pipeline.read_output(viewport.output(ViewportPass::VIEWPORT)).unwrap(),
        Rect::new(0, 0, 16, 12)
    );
    assert_eq!(gc.software().unwrap().back_buffer().size, Size::new(16, 12));
}

#[test]
fn lost_context_abandons_the_frame() {
    let log = log();
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(NodePass::new(0, 0, &log)).unwrap();
    pipeline.freeze().unwrap();

    let mut gc = software_context(4, 4);
    gc.software_mut().unwrap().lose_context();
    assert!(matches!(
        pipeline.execute(&mut gc, []),
        Err(PipelineError::Graphics(GraphicsError::ContextLost))
    ));
    assert!(log.borrow().is_empty());
    assert_eq!(pipeline.frame(), 0);
}

#[test]
fn destroy_returns_every_pooled_target() {
    let mut gc = software_context(16, 16);
    let (mut pipeline, passes) =
        standard_pipeline(&mut gc, Color::BLACK, BloomSettings::default()).unwrap();
    assert_eq!(pipeline.order().unwrap(), &[0, 1, 2, 3, 4]);
    pipeline.execute(&mut gc, []).unwrap();
    assert!(pipeline.pass(passes.geometry).is_some());
    assert!(gc.pool_stats().live > 0);

    pipeline.destroy(&mut gc);
    assert_eq!(gc.pool_stats().live, 0);
}

#[test]
fn abandoned_frames_still_end() {
    let log = log();
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(NodePass::new(0, 0, &log).silent()).unwrap();
    pipeline.add_pass(NodePass::new(1, 1, &log)).unwrap();
    pipeline.connect_named(0, "out", 1, "in0").unwrap();
    pipeline.freeze().unwrap();

    let mut gc = software_context(4, 4);
    assert!(pipeline.execute(&mut gc, []).is_err());
    assert_eq!(*log.borrow(), vec![0]);
    assert_eq!(gc.software().unwrap().stats().frames_ended, 1);
}

#[test]
fn passes_are_released_in_reverse_insertion_order() {
    let released = log();
    let log = log();
    let mut pipeline = Pipeline::new();
    for (id, inputs) in [(0, 1), (1, 0), (2, 0)] {
        pipeline
            .add_pass(NodePass::new(id, inputs, &log).recording_release(&released))
            .unwrap();
    }
    pipeline.connect_named(1, "out", 0, "in0").unwrap();
    pipeline.freeze().unwrap();
    assert_eq!(pipeline.order().unwrap(), &[1, 0, 2]);

    let mut gc = software_context(4, 4);
    pipeline.execute(&mut gc, []).unwrap();
    pipeline.destroy(&mut gc);
    assert_eq!(*released.borrow(), vec![2, 1, 0]);
}
