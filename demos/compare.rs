use trapezir::core::IntegrationDomain;
use trapezir::integrators::trapezoid;

/// Integrating the function cos(x) * sin(y)
/// over [0, pi/2] x [0, pi/2]
/// which gives the result: 1
fn main() {
    let half_pi = std::f64::consts::FRAC_PI_2;
    let domain = IntegrationDomain::new(
        vec![0.0, 0.0],
        vec![half_pi, half_pi],
        vec![1000, 1000],
    )
    .unwrap();

    let integrand = |point: &[f64]| point[0].cos() * point[1].sin();

    let sequential = trapezoid::integrate(&integrand, &domain);
    println!("sequential:        {}", sequential);

    for workers in &[2, 4, 8] {
        let parallel = trapezoid::integrate_on_workers(&integrand, &domain, *workers);
        println!("{} workers:         {}", workers, parallel);
    }
}
