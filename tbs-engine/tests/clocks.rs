// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use tbs_engine::test_helpers::start_test;

/// Test that runs different clocks that add to a shared vector and then checks
/// that everything has been done in the correct order and at the right times.
#[test]
fn dual_clock() {
    let mut engine = start_test(file!());

    let clk1 = engine.clock_mhz(1000.0);
    let clk2 = engine.clock_mhz(1800.0);

    let all_values = Rc::new(RefCell::new(Vec::new()));

    let values = all_values.clone();
    engine.spawn(async move {
        for _ in 0..5 {
            clk1.wait_ticks(1).await;
            values.borrow_mut().push((1, clk1.tick_now().tick()));
        }
        Ok(())
    });

    let values = all_values.clone();
    engine.spawn(async move {
        for _ in 0..5 {
            clk2.wait_ticks(1).await;
            values.borrow_mut().push((2, clk2.tick_now().tick()));
        }
        Ok(())
    });

    engine.run().unwrap();

    assert_eq!(
        vec![
            (2, 1),
            (1, 1),
            (2, 2),
            (2, 3),
            (1, 2),
            (2, 4),
            (2, 5),
            (1, 3),
            (1, 4),
            (1, 5),
        ],
        *all_values.borrow()
    );
    approx::assert_relative_eq!(engine.time_now_ns(), 5.0);
}

/// Tasks due at the same tick resume in the order in which they suspended.
#[test]
fn same_tick_is_fifo() {
    let mut engine = start_test(file!());
    let clock = engine.clock_mhz(10.0);
    let order = Rc::new(RefCell::new(Vec::new()));

    // Each task waits a different amount so that they are all due at tick 12,
    // but suspend in the reverse order of their index.
    for i in 0..4_u64 {
        let clock = clock.clone();
        let order = order.clone();
        engine.spawn(async move {
            clock.wait_ticks(3 - i).await;
            clock.wait_ticks(9 + i).await;
            order.borrow_mut().push(i);
            Ok(())
        });
    }

    engine.run().unwrap();
    assert_eq!(*order.borrow(), vec![3, 2, 1, 0]);
    assert_eq!(clock.tick_now().tick(), 12);
}

/// Newly spawned tasks run in spawn order before any time passes.
#[test]
fn spawn_order() {
    let mut engine = start_test(file!());
    let clock = engine.clock_mhz(10.0);
    let order = Rc::new(RefCell::new(Vec::new()));

    for i in 0..5 {
        let order = order.clone();
        let clock = clock.clone();
        engine.spawn(async move {
            order.borrow_mut().push((i, clock.tick_now().tick()));
            Ok(())
        });
    }

    engine.run().unwrap();
    assert_eq!(
        *order.borrow(),
        vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)]
    );
}

/// A zero tick wait yields to every other task already due at this tick.
#[test]
fn zero_wait_yields() {
    let mut engine = start_test(file!());
    let clock = engine.clock_mhz(10.0);
    let order = Rc::new(RefCell::new(Vec::new()));

    {
        let order = order.clone();
        let clock = clock.clone();
        engine.spawn(async move {
            clock.wait_ticks(0).await;
            order.borrow_mut().push("yielded");
            Ok(())
        });
    }
    {
        let order = order.clone();
        engine.spawn(async move {
            order.borrow_mut().push("second");
            Ok(())
        });
    }

    engine.run().unwrap();
    assert_eq!(*order.borrow(), vec!["second", "yielded"]);
    assert_eq!(clock.tick_now().tick(), 0);
}

/// Awaiting an async function composes its delays into the calling task.
#[test]
fn sub_task_composition() {
    async fn transmit(clock: &tbs_engine::time::clock::Clock, bits: u64) -> u64 {
        clock.wait_ticks(bits).await;
        clock.tick_now().tick()
    }

    let mut engine = start_test(file!());
    let clock = engine.clock_mhz(10.0);
    let done = Rc::new(RefCell::new(Vec::new()));

    {
        let done = done.clone();
        engine.spawn(async move {
            let first = transmit(&clock, 1208).await;
            let second = transmit(&clock, 368).await;
            done.borrow_mut().push(first);
            done.borrow_mut().push(second);
            Ok(())
        });
    }

    engine.run().unwrap();
    assert_eq!(*done.borrow(), vec![1208, 1576]);
    approx::assert_relative_eq!(engine.time_now_ns(), 157_600.0);
}
