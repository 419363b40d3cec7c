use crate::task::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// Predicate that never completes on its own
fn pending(name: &str) -> Task {
    Task::new(name, |_, _| Ok(false))
}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

fn bump(count: &Rc<Cell<u32>>) -> impl FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static {
    let count = Rc::clone(count);
    move |_| {
        count.set(count.get() + 1);
        Ok(())
    }
}

fn log_into(
    log: &Rc<RefCell<Vec<String>>>,
    entry: &str,
) -> impl FnMut(&mut TaskContext<'_>) -> anyhow::Result<()> + 'static {
    let log = Rc::clone(log);
    let entry = entry.to_string();
    move |_| {
        log.borrow_mut().push(entry.clone());
        Ok(())
    }
}

#[test]
fn test_task_defaults() {
    let task = Task::instant("leaf");

    assert_eq!(task.name(), "leaf");
    assert!(task.is_blocking());
    assert!(task.blocks_parent_completion());
    assert!(!task.runs_children_always());
    assert!(!task.is_started());
    assert!(!task.is_complete());
    assert!(task.is_empty());
    assert_eq!(task.tick_interval(), 0.0);
    assert!(task.parent().is_none());
}

#[test]
fn test_attach_sets_parent_and_collections() {
    let mut tree = TaskTree::default();
    let root = tree.root();

    let a = tree.then(root, Task::instant("a")).unwrap();
    let b = tree.then_also(root, Task::instant("b")).unwrap();
    let c = tree.also(root, Task::instant("c")).unwrap();

    let root_task = tree.task(root).unwrap();
    assert_eq!(root_task.sequential(), &[a, b]);
    assert_eq!(root_task.parallel(), &[c]);
    assert_eq!(tree.parent_of(a).unwrap(), Some(root));
    assert!(!tree.task(b).unwrap().is_blocking());
    assert!(!tree.task(c).unwrap().is_blocking());
    assert_eq!(tree.root_of(c).unwrap(), root);
    assert_eq!(tree.len(), 4);
}

#[test]
fn test_finished_matches_completion_rule() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let blocker = tree.then(root, pending("blocker")).unwrap();
    let free = tree
        .also(root, pending("free").block_parent_completion(false))
        .unwrap();

    tree.update(0.1).unwrap();
    // Locally complete but a blocking child remains.
    assert!(tree.task(root).unwrap().is_complete());
    assert!(!tree.is_finished());
    assert!(!tree.is_task_finished(free).unwrap());

    tree.cancel(blocker).unwrap();
    assert!(tree.is_task_finished(blocker).unwrap());

    // The cancelled head is dropped and only a non-blocking child is left.
    assert!(tree.update(0.1).unwrap());
    assert!(tree.is_finished());
}

#[test]
fn test_then_also_is_promoted_after_one_tick() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let background = tree.then_also(root, pending("background")).unwrap();
    let next = tree.then(root, pending("next")).unwrap();

    assert_eq!(tree.task(root).unwrap().sequential(), &[background, next]);

    tree.update(0.016).unwrap();

    let root_task = tree.task(root).unwrap();
    assert_eq!(root_task.sequential(), &[next]);
    assert_eq!(root_task.parallel(), &[background]);
}

#[test]
fn test_instant_chain_cascades_in_one_update() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for name in ["one", "two", "three"] {
        let seen = Rc::clone(&seen);
        tree.then(
            root,
            Task::new(name, move |_, dt| {
                seen.borrow_mut().push(dt);
                Ok(true)
            }),
        )
        .unwrap();
    }

    assert!(tree.update(0.5).unwrap());
    assert_eq!(*seen.borrow(), vec![0.5, 0.0, 0.0]);
    assert!(tree.task(root).unwrap().is_empty());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_sequential_scenario_with_elapsed_predicate() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let a = tree.then(root, Task::instant("A")).unwrap();
    let b = tree
        .then(root, Task::new("B", |ctx, _| Ok(ctx.elapsed() >= 2.0)))
        .unwrap();

    tree.update(1.0).unwrap();
    assert!(!tree.contains(a));
    assert!(tree.task(b).unwrap().is_started());
    assert_eq!(tree.task(b).unwrap().elapsed(), 0.0);

    tree.update(1.0).unwrap();
    assert_eq!(tree.task(b).unwrap().elapsed(), 1.0);
    assert!(!tree.is_task_finished(b).unwrap());

    assert!(tree.update(1.0).unwrap());
    assert!(tree.is_finished());
    assert!(!tree.contains(b));
}

#[test]
fn test_interval_quantizes_steps() {
    let calls = counter();
    let quantized = {
        let calls = Rc::clone(&calls);
        Task::new("quantized", move |_, _| {
            calls.set(calls.get() + 1);
            Ok(false)
        })
        .interval(0.1)
    };
    let mut tree = TaskTree::new(quantized);

    tree.update(0.03).unwrap();
    assert_eq!(calls.get(), 1, "first update always steps once");
    tree.update(0.04).unwrap();
    assert_eq!(calls.get(), 1);
    tree.update(0.05).unwrap();
    assert_eq!(calls.get(), 2);
    assert!((tree.task(tree.root()).unwrap().elapsed() - 0.1).abs() < 1e-9);

    let free_calls = counter();
    let free = {
        let calls = Rc::clone(&free_calls);
        Task::new("free", move |_, _| {
            calls.set(calls.get() + 1);
            Ok(false)
        })
    };
    let mut tree = TaskTree::new(free);
    for dt in [0.03, 0.04, 0.05] {
        tree.update(dt).unwrap();
    }
    assert_eq!(free_calls.get(), 3);
}

#[test]
fn test_interval_passes_fixed_delta() {
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let task = {
        let deltas = Rc::clone(&deltas);
        Task::new("fixed", move |_, dt| {
            deltas.borrow_mut().push(dt);
            Ok(false)
        })
        .interval(0.25)
    };
    let mut tree = TaskTree::new(task);

    tree.update(0.6).unwrap();
    assert_eq!(*deltas.borrow(), vec![0.0, 0.25, 0.25]);
}

#[test]
fn test_local_interval_nests_inside_subtree_interval() {
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let task = {
        let deltas = Rc::clone(&deltas);
        Task::new("nested", move |_, dt| {
            deltas.borrow_mut().push(dt);
            Ok(false)
        })
        .interval(0.1)
        .local_interval(0.2)
    };
    let mut tree = TaskTree::new(task);

    // Subtree steps at 0.0, 0.1, 0.2, 0.3, 0.4; the local timer only reaches
    // a whole 0.2 boundary on the second and fourth of the 0.1 steps.
    tree.update(0.45).unwrap();
    assert_eq!(*deltas.borrow(), vec![0.0, 0.2, 0.2]);

    let root = tree.task(tree.root()).unwrap();
    assert!((root.elapsed() - 0.4).abs() < 1e-9);
    assert!((root.local_elapsed() - 0.4).abs() < 1e-9);
}

#[test]
fn test_now_suspends_and_resumes_head_once() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let suspended = counter();
    let resumed = counter();
    let head = tree
        .then(
            root,
            pending("head")
                .on_suspend(bump(&suspended))
                .on_resume(bump(&resumed)),
        )
        .unwrap();

    tree.update(1.0).unwrap();
    assert!(tree.task(head).unwrap().is_started());
    let elapsed = tree.task(head).unwrap().elapsed();

    tree.now(root, Task::instant("urgent")).unwrap();
    assert_eq!(suspended.get(), 1);
    assert!(tree.task(head).unwrap().is_suspended());
    assert_eq!(tree.task(root).unwrap().sequential()[1], head);

    tree.update(1.0).unwrap();
    assert_eq!(suspended.get(), 1);
    assert_eq!(resumed.get(), 1);
    assert!(!tree.task(head).unwrap().is_suspended());
    // The urgent task finished first, so the head resumed on a zero-delta cascade.
    assert_eq!(tree.task(head).unwrap().elapsed(), elapsed);

    tree.update(1.0).unwrap();
    assert_eq!(resumed.get(), 1);
}

#[test]
fn test_now_does_not_suspend_unstarted_head() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let suspended = counter();
    let head = tree
        .then(root, pending("head").on_suspend(bump(&suspended)))
        .unwrap();

    tree.now(root, pending("first")).unwrap();

    assert_eq!(suspended.get(), 0);
    assert!(!tree.task(head).unwrap().is_suspended());
}

#[test]
fn test_before_and_after_place_by_name() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let a = tree.then(root, pending("a")).unwrap();
    let c = tree.then(root, pending("c")).unwrap();

    let b = tree.after(root, "a", pending("b")).unwrap();
    let start = tree.before(root, "a", pending("start")).unwrap();

    assert_eq!(tree.task(root).unwrap().sequential(), &[start, a, b, c]);
}

#[test]
fn test_before_head_suspends_and_resumes_it_once() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let suspended = counter();
    let resumed = counter();
    let head = tree
        .then(
            root,
            pending("head")
                .on_suspend(bump(&suspended))
                .on_resume(bump(&resumed)),
        )
        .unwrap();
    tree.update(0.5).unwrap();

    let first = tree.before(root, "head", Task::instant("first")).unwrap();
    assert_eq!(suspended.get(), 1);
    assert_eq!(resumed.get(), 0);
    assert!(tree.task(head).unwrap().is_suspended());
    assert_eq!(tree.task(root).unwrap().sequential(), &[first, head]);

    tree.update(0.5).unwrap();
    assert_eq!(suspended.get(), 1);
    assert_eq!(resumed.get(), 1);
    assert!(!tree.task(head).unwrap().is_suspended());
    assert!(!tree.contains(first));
}

#[test]
fn test_missing_reference_is_not_found() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    tree.then(root, pending("present")).unwrap();

    let error = tree.after(root, "absent", pending("x")).unwrap_err();
    assert!(matches!(error, TaskError::NotFound { ref name, .. } if name == "absent"));
    assert_eq!(error.to_string(), "failed to find [absent] in task [root]");

    assert!(tree.before(root, "absent", pending("y")).is_err());
    assert!(tree.get(root, "absent").is_err());
    assert!(tree.find(root, "absent").is_none());
    assert!(!tree.sequence_contains(root, "absent"));
    assert!(tree.sequence_contains(root, "present"));
    // Failed attachments leave the tree untouched.
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_get_deep_searches_subtree() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let branch = tree.also(root, pending("branch")).unwrap();
    let inner = tree.then(branch, pending("inner")).unwrap();
    let leaf = tree.then(inner, pending("leaf")).unwrap();

    assert_eq!(tree.get(root, "branch").unwrap(), branch);
    assert!(tree.get(root, "leaf").is_err());
    assert_eq!(tree.get_deep(root, "leaf").unwrap(), leaf);
    assert_eq!(tree.find_deep(branch, "leaf"), Some(leaf));
    assert!(tree.get_deep(root, "nowhere").is_err());
}

#[test]
fn test_cancel_reaches_children_before_parent() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut tree = TaskTree::new(pending("root").on_cancel(log_into(&log, "root")));
    let root = tree.root();

    let seq = tree
        .then(root, pending("seq").on_cancel(log_into(&log, "seq")))
        .unwrap();
    tree.then(seq, pending("seq-child").on_cancel(log_into(&log, "seq-child")))
        .unwrap();
    tree.also(root, pending("p1").on_cancel(log_into(&log, "p1")))
        .unwrap();
    tree.also(root, pending("p2").on_cancel(log_into(&log, "p2")))
        .unwrap();

    tree.update(0.1).unwrap();
    tree.cancel(root).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["seq-child", "seq", "p2", "p1", "root"]
    );
    let root_task = tree.task(root).unwrap();
    assert!(root_task.is_empty());
    assert!(root_task.is_cancelled());
    assert!(tree.is_finished());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_failed_child_cancel_keeps_remaining_children() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let seq_cancels = counter();
    let seq = tree
        .then(root, pending("seq").on_cancel(bump(&seq_cancels)))
        .unwrap();
    let calm_cancels = counter();
    let calm = tree
        .also(root, pending("calm").on_cancel(bump(&calm_cancels)))
        .unwrap();
    let bad = tree
        .also(
            root,
            pending("bad").on_cancel(|_| Err(anyhow::anyhow!("boom"))),
        )
        .unwrap();
    tree.update(0.1).unwrap();

    assert!(tree.cancel(root).is_err());
    assert_eq!(seq_cancels.get(), 1);
    assert!(!tree.contains(seq));
    // The failing sibling stops the pass; the rest stays attached and untouched.
    assert_eq!(calm_cancels.get(), 0);
    assert!(!tree.task(root).unwrap().is_cancelled());
    assert_eq!(tree.task(root).unwrap().parallel(), &[calm, bad]);
    assert!(tree.task(bad).unwrap().is_cancelled());

    // The failing task is already cancelled, so the retry goes through.
    tree.cancel(root).unwrap();
    assert_eq!(calm_cancels.get(), 1);
    assert!(tree.task(root).unwrap().is_cancelled());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_cancel_children_leaves_parent_running() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let cancels = counter();
    tree.then(root, pending("first").on_cancel(bump(&cancels)))
        .unwrap();
    tree.also(root, pending("side").on_cancel(bump(&cancels)))
        .unwrap();
    tree.update(0.1).unwrap();

    tree.cancel_children(root).unwrap();
    assert_eq!(cancels.get(), 2);
    let root_task = tree.task(root).unwrap();
    assert!(root_task.is_empty());
    assert!(!root_task.is_cancelled());
    assert_eq!(tree.len(), 1);

    tree.then(root, Task::instant("next")).unwrap();
    assert!(tree.update(0.1).unwrap());
}

#[test]
fn test_cancel_mid_update_fires_cancel_update() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let cancel_updates = counter();
    let cancels = counter();
    let started = tree
        .then(
            root,
            pending("started")
                .on_cancel_update(bump(&cancel_updates))
                .on_cancel(bump(&cancels)),
        )
        .unwrap();
    let idle_updates = counter();
    let idle = tree
        .then(root, pending("idle").on_cancel_update(bump(&idle_updates)))
        .unwrap();

    tree.update(0.1).unwrap();
    tree.cancel(started).unwrap();
    tree.cancel(idle).unwrap();

    assert_eq!(cancel_updates.get(), 1);
    assert_eq!(idle_updates.get(), 0);
    assert!(tree.task(started).unwrap().is_complete());

    // Cancelling twice is a no-op.
    tree.cancel(started).unwrap();
    assert_eq!(cancels.get(), 1);
}

#[test]
fn test_cancel_from_predicate_stops_completion() {
    let finished = counter();
    let mut tree = TaskTree::default();
    let root = tree.root();
    let task = tree
        .then(
            root,
            Task::new("quitter", |ctx, _| {
                ctx.cancel()?;
                Ok(true)
            })
            .on_finish(bump(&finished)),
        )
        .unwrap();

    assert!(tree.update(0.1).unwrap());
    assert_eq!(finished.get(), 0);
    assert!(!tree.contains(task));
}

#[test]
fn test_finish_all_refires_after_reattach() {
    let finish_all = Rc::new(Cell::new(0u32));
    let root_task = {
        let finish_all = Rc::clone(&finish_all);
        Task::instant("looping").on_finish_all(move |ctx| {
            finish_all.set(finish_all.get() + 1);
            if finish_all.get() < 2 {
                ctx.then(Task::instant("again"))?;
            }
            Ok(())
        })
    };
    let mut tree = TaskTree::new(root_task);
    tree.then(tree.root(), Task::instant("first")).unwrap();

    assert!(!tree.update(0.1).unwrap());
    assert_eq!(finish_all.get(), 1);

    assert!(tree.update(0.1).unwrap());
    assert_eq!(finish_all.get(), 2);

    tree.update(0.1).unwrap();
    assert_eq!(finish_all.get(), 2);
}

#[test]
fn test_finish_fires_once_per_completion() {
    let finished = counter();
    let mut tree = TaskTree::new(Task::instant("root").on_finish(bump(&finished)));
    let root = tree.root();
    tree.then(root, pending("child")).unwrap();

    for _ in 0..3 {
        tree.update(0.1).unwrap();
    }
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_non_blocking_leftovers_are_force_finished() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let finished = counter();
    let finished_all = counter();
    let background = tree
        .also(
            root,
            Task::infinite("background")
                .block_parent_completion(false)
                .on_finish(bump(&finished))
                .on_finish_all(bump(&finished_all)),
        )
        .unwrap();
    tree.then(root, Task::instant("main")).unwrap();
    let gate_finished = counter();
    tree.then(
        root,
        pending("gate")
            .block_parent_completion(false)
            .on_finish(bump(&gate_finished)),
    )
    .unwrap();
    let unstarted_cancels = counter();
    tree.then(
        root,
        pending("never-run")
            .block_parent_completion(false)
            .on_cancel(bump(&unstarted_cancels)),
    )
    .unwrap();

    assert!(tree.update(0.1).unwrap());
    assert_eq!(finished.get(), 1);
    assert_eq!(finished_all.get(), 1);
    assert_eq!(gate_finished.get(), 1);
    // Leftovers that never started are cancelled instead of finished.
    assert_eq!(unstarted_cancels.get(), 1);
    assert!(!tree.contains(background));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_failed_force_finish_keeps_remaining_leftovers() {
    let mut tree = TaskTree::new(Task::instant("root"));
    let root = tree.root();
    let bad = tree
        .also(
            root,
            Task::infinite("bad")
                .block_parent_completion(false)
                .on_finish(|_| Err(anyhow::anyhow!("boom"))),
        )
        .unwrap();
    let calm_finished = counter();
    let calm = tree
        .also(
            root,
            Task::infinite("calm")
                .block_parent_completion(false)
                .on_finish(bump(&calm_finished)),
        )
        .unwrap();

    assert!(tree.update(0.1).is_err());
    assert_eq!(calm_finished.get(), 0);
    assert_eq!(tree.task(root).unwrap().parallel(), &[bad, calm]);
    assert!(tree.task(bad).unwrap().is_complete());

    tree.cancel_children(root).unwrap();
    assert!(tree.task(root).unwrap().is_empty());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_always_run_children_runs_before_local_completion() {
    let mut tree = TaskTree::new(Task::infinite("loop"));
    let root = tree.root();
    let child_done = counter();
    tree.then(root, Task::instant("child").on_finish(bump(&child_done)))
        .unwrap();

    tree.update(0.1).unwrap();
    assert_eq!(child_done.get(), 1);
    assert!(!tree.task(root).unwrap().is_complete());
    assert!(!tree.is_finished());

    let mut idle = TaskTree::new(pending("idle"));
    let idle_root = idle.root();
    let idle_done = counter();
    idle.then(idle_root, Task::instant("child").on_finish(bump(&idle_done)))
        .unwrap();
    idle.update(0.1).unwrap();
    assert_eq!(idle_done.get(), 0);
}

#[test]
fn test_leftovers_keep_running_until_parent_completes() {
    let done = Rc::new(Cell::new(false));
    let flag = Rc::clone(&done);
    let finished_all = counter();
    let mut tree = TaskTree::new(
        Task::new("loop", move |_, _| Ok(flag.get()))
            .always_run_children(true)
            .on_finish_all(bump(&finished_all)),
    );
    let root = tree.root();
    let background_finished = counter();
    let background = tree
        .also(
            root,
            Task::infinite("background")
                .block_parent_completion(false)
                .on_finish(bump(&background_finished)),
        )
        .unwrap();

    assert!(!tree.update(0.1).unwrap());
    assert_eq!(finished_all.get(), 1);
    assert_eq!(background_finished.get(), 0);
    assert!(tree.contains(background));

    done.set(true);
    assert!(tree.update(0.1).unwrap());
    assert_eq!(background_finished.get(), 1);
    assert!(!tree.contains(background));
    assert_eq!(finished_all.get(), 1);
}

#[test]
fn test_routed_predicate_error_completes_task() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let mut tree = TaskTree::default();
    let root = tree.root();
    let recorder = Rc::clone(&errors);
    let failing = tree
        .then(
            root,
            Task::new("failing", |_, _| Err(anyhow::anyhow!("boom"))).on_exception(
                move |_, error| recorder.borrow_mut().push((error.phase(), error.to_string())),
            ),
        )
        .unwrap();

    assert!(tree.update(0.1).unwrap());
    assert!(!tree.contains(failing));
    assert_eq!(
        *errors.borrow(),
        vec![(
            Some(TaskPhase::Update),
            "task [failing] failed during update: boom".to_string()
        )]
    );
}

#[test]
fn test_unhandled_error_propagates_out_of_update() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let sibling = counter();
    tree.also(root, pending("sibling").on_start(bump(&sibling)))
        .unwrap();
    tree.then(
        root,
        pending("loud").on_start(|_| Err(anyhow::anyhow!("no start"))),
    )
    .unwrap();

    let error = tree.update(0.1).unwrap_err();
    assert_eq!(error.phase(), Some(TaskPhase::Start));
    assert!(matches!(error, TaskError::Callback { ref task, .. } if task == "loud"));
    // Siblings processed earlier in the tick keep their state.
    assert_eq!(sibling.get(), 1);
}

#[test]
fn test_ancestor_traps_child_error() {
    let trapped = counter();
    let seen = Rc::clone(&trapped);
    let mut tree = TaskTree::new(Task::instant("guard").on_exception(move |_, _| {
        seen.set(seen.get() + 1);
    }));
    let root = tree.root();
    let bad = tree
        .then(
            root,
            Task::new("bad", |_, _| Err(anyhow::anyhow!("bad predicate"))),
        )
        .unwrap();

    tree.update(0.1).unwrap();
    assert_eq!(trapped.get(), 1);
    // The failing child has no handler of its own, so it stays incomplete.
    assert!(!tree.task(bad).unwrap().is_complete());
    assert!(!tree.is_finished());

    tree.update(0.1).unwrap();
    assert_eq!(trapped.get(), 2);
}

#[test]
fn test_callbacks_may_attach_during_tick() {
    let mut tree = TaskTree::default();
    let root = tree.root();
    let follow_up = counter();
    let counted = Rc::clone(&follow_up);
    tree.then(
        root,
        Task::instant("spawner").on_finish(move |ctx| {
            let parent = ctx.parent().unwrap_or_else(|| ctx.id());
            let counted = Rc::clone(&counted);
            ctx.tree().then(
                parent,
                Task::instant("follow-up").on_finish(move |_| {
                    counted.set(counted.get() + 1);
                    Ok(())
                }),
            )?;
            Ok(())
        }),
    )
    .unwrap();

    assert!(tree.update(0.1).unwrap());
    assert_eq!(follow_up.get(), 1);
}

#[test]
fn test_blocked_signal_is_silent() {
    let started = counter();
    let mut task = pending("quiet").on_start(bump(&started));
    task.events_mut().on_start.block();
    let mut tree = TaskTree::new(task);

    tree.update(0.1).unwrap();
    assert_eq!(started.get(), 0);
    assert!(tree.task(tree.root()).unwrap().is_started());
}

#[test]
fn test_unknown_task_id() {
    let mut tree = TaskTree::default();
    let stranger = Task::instant("stranger").id();

    assert!(matches!(tree.task(stranger), Err(TaskError::UnknownTask(id)) if id == stranger));
    assert!(tree.update_task(stranger, 0.1).is_err());
    assert!(tree.cancel(stranger).is_err());
}

struct Countdown {
    remaining: u32,
    events: Rc<RefCell<Vec<&'static str>>>,
}

impl Behavior for Countdown {
    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        self.remaining = self.remaining.saturating_sub(1);
        Ok(self.remaining == 0)
    }

    fn on_start(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.events.borrow_mut().push("start");
        Ok(())
    }

    fn on_finish(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.events.borrow_mut().push("finish");
        Ok(())
    }

    fn on_finish_all(&mut self, _ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.events.borrow_mut().push("finish-all");
        Ok(())
    }
}

#[test]
fn test_behavior_drives_task() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut tree = TaskTree::default();
    let root = tree.root();
    let id = tree
        .then(
            root,
            Task::from_behavior(Countdown {
                remaining: 3,
                events: Rc::clone(&events),
            }),
        )
        .unwrap();

    assert_eq!(tree.task(id).unwrap().name(), "Countdown");
    tree.update(0.1).unwrap();
    tree.update(0.1).unwrap();
    assert_eq!(*events.borrow(), vec!["start"]);

    assert!(tree.update(0.1).unwrap());
    assert_eq!(*events.borrow(), vec!["start", "finish", "finish-all"]);
}

struct Forgiving {
    errors: Rc<Cell<u32>>,
}

impl Behavior for Forgiving {
    fn update(&mut self, _ctx: &mut TaskContext<'_>, _dt: f64) -> anyhow::Result<bool> {
        anyhow::bail!("always fails")
    }

    fn on_exception(&mut self, _ctx: &mut TaskContext<'_>, _error: &TaskError) {
        self.errors.set(self.errors.get() + 1);
    }

    fn handles_exceptions(&self) -> bool {
        true
    }
}

#[test]
fn test_behavior_exception_hook() {
    let errors = counter();
    let shared = Rc::new(RefCell::new(Forgiving {
        errors: Rc::clone(&errors),
    }));
    let task = Task::from_shared_behavior("forgiving", Rc::clone(&shared));
    assert!(task.events().handles_exceptions());

    let mut tree = TaskTree::new(task);
    assert!(tree.update(0.1).unwrap());
    assert_eq!(errors.get(), 1);
    assert_eq!(shared.borrow().errors.get(), 1);
}
