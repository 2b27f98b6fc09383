//! Writes a deterministic sample pickups CSV so the dashboard and tests can
//! run without the network (point it at the file through a
//! `FileSource`-backed loader).

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // NYC center used by the dashboard's map view.
    let (center_lat, center_lon) = (40.730610, -73.935242);
    let bases = ["B02512", "B02598", "B02617", "B02682", "B02764"];
    let september = NaiveDate::from_ymd_opt(2014, 9, 1).context("valid date")?;

    let n_rows = 5_000;
    let output_path = "sample_pickups.csv";
    let mut file = std::fs::File::create(output_path)
        .with_context(|| format!("creating {output_path}"))?;

    writeln!(file, "Date/Time,Lat,Lon,Base")?;
    for _ in 0..n_rows {
        // Spread pickups over the month with an evening rush bias.
        let day = (rng.next_u64() % 30) as i64;
        let hour = (rng.gauss(17.0, 5.0).rem_euclid(24.0)) as i64;
        let minute = (rng.next_u64() % 60) as i64;
        let second = (rng.next_u64() % 60) as i64;
        let when = september
            .and_hms_opt(0, 0, 0)
            .context("valid time")?
            + Duration::days(day)
            + Duration::hours(hour)
            + Duration::minutes(minute)
            + Duration::seconds(second);

        let lat = rng.gauss(center_lat, 0.03);
        let lon = rng.gauss(center_lon, 0.03);
        let base = rng.pick(&bases);

        writeln!(
            file,
            "{},{:.4},{:.4},{}",
            when.format("%m/%d/%Y %H:%M:%S"),
            lat,
            lon,
            base
        )?;
    }

    println!("Wrote {n_rows} pickups to {output_path}");
    Ok(())
}
