use trapezir::collective::{self, Communicator, Role, SoloCommunicator};
use trapezir::core::IntegrationDomain;
use trapezir::integrators::trapezoid;
use trapezir::task::{ParallelTrapezoid, SequentialTrapezoid, Task, TaskData};

use assert_approx_eq::assert_approx_eq;
use crossbeam as cb;

// Tolerance to use when comparing against closed-form integrals and between the
// sequential and the parallel evaluator.
const TOLERANCE: f64 = 1e-2;

fn cos_sin(point: &[f64]) -> f64 {
    point[0].cos() * point[1].sin()
}

#[test]
fn linear_integrand_over_unit_square() {
    // int_0^1 int_0^1 (x + y) dx dy = 1
    let domain =
        IntegrationDomain::new(vec![0.0, 0.0], vec![1.0, 1.0], vec![10, 10]).unwrap();
    let result = trapezoid::integrate(&|point: &[f64]| point[0] + point[1], &domain);

    assert_approx_eq!(result, 1.0, 1e-9);
}

#[test]
fn cosine_sine_closed_form() {
    // int_0^{pi/2} int_0^{pi/2} cos(x) sin(y) dx dy = 1
    let half_pi = std::f64::consts::FRAC_PI_2;
    let domain =
        IntegrationDomain::new(vec![0.0, 0.0], vec![half_pi, half_pi], vec![1000, 1000])
            .unwrap();

    let sequential = trapezoid::integrate(&cos_sin, &domain);
    assert_approx_eq!(sequential, 1.0, TOLERANCE);

    let parallel = trapezoid::integrate_on_workers(&cos_sin, &domain, 4);
    assert_approx_eq!(parallel, 1.0, TOLERANCE);
}

#[test]
fn parallel_agrees_with_sequential_for_any_worker_count() {
    let domain = IntegrationDomain::new(
        vec![-1.0, -1.0, 0.0],
        vec![1.0, 1.0, 2.0],
        vec![20, 30, 10],
    )
    .unwrap();
    let integrand =
        |point: &[f64]| (point[0] * point[0] + point[1] * point[1]).sqrt() * point[2];

    let sequential = trapezoid::integrate(&integrand, &domain);

    for workers in &[1, 2, 4, 5] {
        let parallel = trapezoid::integrate_on_workers(&integrand, &domain, *workers);
        assert_approx_eq!(parallel, sequential, TOLERANCE);
    }
}

#[test]
fn zero_integrand_integrates_to_zero() {
    let domain =
        IntegrationDomain::new(vec![-5.0, 2.0], vec![5.0, 3.0], vec![13, 17]).unwrap();

    assert_eq!(trapezoid::integrate(&|_: &[f64]| 0.0, &domain), 0.0);
    assert_eq!(
        trapezoid::integrate_on_workers(&|_: &[f64]| 0.0, &domain, 3),
        0.0
    );
}

#[test]
fn sequential_task_pipeline() {
    let data = TaskData::for_integration(2, &[0.0, 0.0], &[1.0, 1.0], &[10, 10]);
    let mut task = SequentialTrapezoid::new(data, |point: &[f64]| point[0] + point[1]);

    assert!(task.validation());
    assert!(task.pre_processing());
    assert!(task.run());
    assert!(task.post_processing());

    let data = task.into_data();
    assert_approx_eq!(data.output_real(0).unwrap(), 1.0, 1e-9);
}

#[test]
fn parallel_task_pipeline_on_threads() {
    let half_pi = std::f64::consts::FRAC_PI_2;
    let members = collective::connect(4);

    let outputs = cb::thread::scope(|s| {
        let mut handles = Vec::with_capacity(members.len());

        for member in members {
            handles.push(s.spawn(move |_| {
                let data = if member.role() == Role::Coordinator {
                    TaskData::for_integration(
                        2,
                        &[0.0, 0.0],
                        &[half_pi, half_pi],
                        &[100, 100],
                    )
                } else {
                    TaskData::new()
                };
                let coordinating = member.role() == Role::Coordinator;
                let mut task = ParallelTrapezoid::new(data, cos_sin, member);

                assert!(task.validation());
                assert!(task.pre_processing());
                assert!(task.run());
                assert!(task.post_processing());

                if coordinating {
                    task.data().output_real(0)
                } else {
                    None
                }
            }));
        }

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();

    assert_approx_eq!(outputs[0].unwrap(), 1.0, TOLERANCE);
    assert!(outputs[1..].iter().all(Option::is_none));
}

#[test]
fn validation_rejects_bad_requests() {
    let integrand = |_: &[f64]| 0.0;

    // zero dimension
    let data = TaskData::for_integration(0, &[], &[], &[]);
    assert!(!SequentialTrapezoid::new(data, integrand).validation());

    // lower bound not strictly below upper bound
    let data = TaskData::for_integration(2, &[1.0, 0.0], &[0.0, 1.0], &[10, 10]);
    assert!(!SequentialTrapezoid::new(data, integrand).validation());

    // non-positive step counts
    let data = TaskData::for_integration(2, &[0.0, 0.0], &[1.0, 1.0], &[10, 0]);
    assert!(!SequentialTrapezoid::new(data, integrand).validation());
    let data = TaskData::for_integration(2, &[0.0, 0.0], &[1.0, 1.0], &[-5, 10]);
    assert!(!SequentialTrapezoid::new(data, integrand).validation());

    // per-axis arrays shorter than the declared dimension
    let data = TaskData::for_integration(3, &[0.0, 0.0], &[1.0, 1.0], &[10, 10]);
    assert!(!SequentialTrapezoid::new(data, integrand).validation());

    // missing steps buffer
    let mut data = TaskData::new();
    data.push_input_index(1);
    data.push_input_reals(&[0.0]);
    data.push_input_reals(&[1.0]);
    data.push_output_real();
    assert!(!SequentialTrapezoid::new(data, integrand).validation());

    // no output buffer
    let mut data = TaskData::for_integration(1, &[0.0], &[1.0], &[10]);
    data.outputs.clear();
    assert!(!SequentialTrapezoid::new(data, integrand).validation());

    // more than one output buffer
    let mut data = TaskData::for_integration(1, &[0.0], &[1.0], &[10]);
    data.push_output_real();
    assert!(!SequentialTrapezoid::new(data, integrand).validation());
}

#[test]
fn declared_count_consistency_is_sequential_only() {
    let integrand = |_: &[f64]| 0.0;

    // tamper with a declared count; the physical buffers stay consistent
    let mut data = TaskData::for_integration(2, &[0.0, 0.0], &[1.0, 1.0], &[10, 10]);
    data.inputs_count[1] = 3;

    let mut sequential = SequentialTrapezoid::new(data.clone(), integrand);
    assert!(!sequential.validation());

    // the parallel variant does not check the declared counts
    let mut parallel = ParallelTrapezoid::new(data, integrand, SoloCommunicator);
    assert!(parallel.validation());
}

#[test]
fn workers_pass_validation_vacuously() {
    let members = collective::connect(2);
    let worker = members.into_iter().nth(1).unwrap();
    assert_eq!(worker.role(), Role::Worker);

    // a worker holds no data and has nothing to validate before the broadcasts
    let mut task = ParallelTrapezoid::new(TaskData::new(), |_: &[f64]| 0.0, worker);
    assert!(task.validation());
    assert!(task.pre_processing());
}

#[test]
fn deserialization_cannot_bypass_validation() {
    // a persisted-and-edited request with a zero step count must be rejected, not
    // silently integrated into a non-finite value
    let result: Result<IntegrationDomain<f64>, _> =
        serde_json::from_str(r#"{"lower":[0.0],"upper":[1.0],"steps":[0]}"#);
    assert!(result.is_err());

    // same for inverted bounds
    let result: Result<IntegrationDomain<f64>, _> =
        serde_json::from_str(r#"{"lower":[1.0,0.0],"upper":[0.0,1.0],"steps":[10,10]}"#);
    assert!(result.is_err());

    // same for mismatched per-axis lengths
    let result: Result<IntegrationDomain<f64>, _> =
        serde_json::from_str(r#"{"lower":[0.0,0.0],"upper":[1.0],"steps":[10]}"#);
    assert!(result.is_err());
}

#[test]
fn stray_worker_domain_is_ignored() {
    // a worker calling with its own domain breaks the documented contract; the broadcast
    // description must still win on every non-coordinator instead of panicking on a
    // dimension mismatch
    let domain =
        IntegrationDomain::new(vec![0.0, 0.0], vec![1.0, 1.0], vec![10, 10]).unwrap();
    let stray = IntegrationDomain::new(vec![0.0], vec![1.0], vec![5]).unwrap();

    let sequential = trapezoid::integrate(&|point: &[f64]| point[0] + point[1], &domain);
    let members = collective::connect(2);

    let results = cb::thread::scope(|s| {
        let mut handles = Vec::with_capacity(members.len());

        for member in members {
            let local_domain = if member.role() == Role::Coordinator {
                &domain
            } else {
                &stray
            };

            handles.push(s.spawn(move |_| {
                trapezoid::integrate_distributed(
                    &|point: &[f64]| point[0] + point[1],
                    Some(local_domain),
                    &member,
                )
            }));
        }

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();

    assert_approx_eq!(results[0].unwrap(), sequential, 1e-12);
    assert_eq!(results[1], None);
}

#[test]
fn domain_serialization_round_trip() {
    let domain =
        IntegrationDomain::new(vec![0.0, -1.5], vec![2.0, 1.5], vec![8, 16]).unwrap();

    let json = serde_json::to_string(&domain).unwrap();
    let deserialized: IntegrationDomain<f64> = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized, domain);
}
