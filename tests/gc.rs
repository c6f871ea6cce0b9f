use schemer::Interpreter;

// ============================================================================
// Collector soundness: nothing allocated solely inside a concluded
// evaluation stays live.
// ============================================================================

#[test]
fn temporaries_are_collected_after_each_run() {
    let mut interp = Interpreter::new();
    let baseline = interp.heap().live_count();

    interp.run("(+ 1 2 3)").unwrap();
    assert_eq!(interp.heap().live_count(), baseline);

    interp.run("(list 1 2 3 4 5)").unwrap();
    assert_eq!(interp.heap().live_count(), baseline);

    interp.run("((lambda (x y) (+ x y)) 3 4)").unwrap();
    assert_eq!(interp.heap().live_count(), baseline);
}

#[test]
fn lambda_activation_scopes_are_released() {
    let mut interp = Interpreter::new();
    interp.run("(define (f x) (* x x))").unwrap();
    let after_define = interp.heap().live_count();

    interp.run("(f 5)").unwrap();
    interp.run("(f 6)").unwrap();
    assert_eq!(interp.heap().live_count(), after_define);
}

#[test]
fn redefinition_releases_the_old_value() {
    let mut interp = Interpreter::new();
    interp.run("(define x (list 1 2 3 4 5))").unwrap();
    let with_list = interp.heap().live_count();

    interp.run("(set! x 1)").unwrap();
    assert!(interp.heap().live_count() < with_list);
}

#[test]
fn failed_runs_are_cleaned_up_by_the_next_success() {
    let mut interp = Interpreter::new();
    let baseline = interp.heap().live_count();

    assert!(interp.run("(car 5)").is_err());
    assert!(interp.heap().live_count() > baseline);

    interp.run("1").unwrap();
    assert_eq!(interp.heap().live_count(), baseline);
}

// ============================================================================
// Collector completeness: everything reachable from the root survives.
// ============================================================================

#[test]
fn definitions_survive_collection() {
    let mut interp = Interpreter::new();
    interp.run("(define x 42)").unwrap();
    interp.run("(define lst (list 1 2 3))").unwrap();

    for _ in 0..10 {
        interp.run("(list 9 9 9 9)").unwrap();
    }

    assert_eq!(interp.run("x").unwrap(), "42");
    assert_eq!(interp.run("lst").unwrap(), "(1 2 3)");
    assert_eq!(interp.run("(car (cdr lst))").unwrap(), "2");
}

#[test]
fn captured_scopes_survive_collection() {
    let mut interp = Interpreter::new();
    interp
        .run("(define (make) (define c 0) (lambda () (set! c (+ c 1)) c))")
        .unwrap();
    interp.run("(define g (make))").unwrap();

    assert_eq!(interp.run("(g)").unwrap(), "1");
    for _ in 0..10 {
        interp.run("(list 1 2 3 4 5 6 7 8)").unwrap();
    }
    assert_eq!(interp.run("(g)").unwrap(), "2");
}

#[test]
fn slots_freed_by_the_collector_are_reused() {
    let mut interp = Interpreter::new();
    interp.run("(list 1 2 3 4 5)").unwrap();
    let total = interp.heap().total_slots();

    // The same shape of garbage fits entirely into freed slots.
    interp.run("(list 1 2 3 4 5)").unwrap();
    assert_eq!(interp.heap().total_slots(), total);
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn cyclic_structures_are_traced_and_collected() {
    let mut interp = Interpreter::new();
    interp.run("(define x (list 1 2))").unwrap();
    interp.run("(set-cdr! x x)").unwrap();
    let with_cycle = interp.heap().live_count();

    // The cycle is still reachable through the binding.
    assert_eq!(interp.run("(car x)").unwrap(), "1");
    assert_eq!(interp.heap().live_count(), with_cycle);

    // Dropping the binding makes the whole cycle collectible.
    interp.run("(set! x 0)").unwrap();
    assert!(interp.heap().live_count() < with_cycle);
}
