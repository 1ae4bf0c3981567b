use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use chrono::Local;
use crossbeam_channel::bounded;
use num::Integer;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrimeError {
    #[error("Generation timeout after {0} ms")]
    Timeout(i64),
    #[error("No prime fits in {0} bits")]
    TooFewBits(u64),
}

/// Source of probable primes and random bytes used by key generation.
pub trait PrimeSource {
    fn probable_prime(&mut self, bits: u64) -> Result<BigUint, PrimeError>;

    fn secure_random_bytes(&mut self, n: usize) -> Vec<u8>;
}

/// Miller-Rabin prime search spread over a few worker threads.
#[derive(Debug, Clone)]
pub struct MillerRabin {
    pub rounds: u32,
    /// per attempt budget in milliseconds
    pub time_max: i64,
    pub threads: usize,
    pub retry: bool,
}

impl Default for MillerRabin {
    fn default() -> Self {
        Self { rounds: 10, time_max: 1000, threads: num_cpus::get(), retry: true }
    }
}

const SMALL_PRIMES: [u32; 15] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

impl MillerRabin {
    pub fn new(rounds: u32, time_max: i64, threads: usize, retry: bool) -> Self {
        Self { rounds, time_max, threads: threads.max(1), retry }
    }

    pub fn is_probable_prime(n: &BigUint, rounds: u32) -> bool {
        let two = BigUint::from(2u32);
        if n < &two { return false; }
        for p in SMALL_PRIMES {
            let p = BigUint::from(p);
            if n == &p { return true; }
            if (n % &p).is_zero() { return false; }
        }
        let n_1 = n - 1u32;
        let mut d = n_1.clone();
        let mut s = 0u64;
        while d.is_even() {
            d >>= 1;
            s += 1;
        }
        let mut rng = rand::thread_rng();
        'witness: for _ in 0..rounds {
            let a = rng.gen_biguint_range(&two, &n_1);
            let mut x = a.modpow(&d, n);
            if x.is_one() || x == n_1 { continue; }
            for _ in 1..s {
                x = x.modpow(&two, n);
                if x == n_1 { continue 'witness; }
            }
            return false;
        }
        true
    }

    /// Candidates keep their top two bits set so that a product of a
    /// `p`-bit and a `q`-bit prime has exactly `p + q` bits.
    fn candidate(bits: u64) -> BigUint {
        let mut rng = rand::thread_rng();
        let mut n = rng.gen_biguint(bits);
        n.set_bit(bits - 1, true);
        n.set_bit(bits - 2, true);
        n.set_bit(0, true);
        n
    }

    pub fn generate_one_prime(bits: u64, rounds: u32, time_max: i64, stop: &AtomicBool) -> Result<BigUint, PrimeError> {
        if bits == 2 { return Ok(BigUint::from(3u32)); }
        let epoch = 0xf;
        let start = Local::now().timestamp_millis();
        let mut try_times = 0;
        loop {
            try_times += epoch;
            for _ in 0..epoch {
                let test = MillerRabin::candidate(bits);
                if MillerRabin::is_probable_prime(&test, rounds) {
                    let time = Local::now().timestamp_millis() - start;
                    log::debug!("Done generation in {} tries after {} ms", try_times, time);
                    return Ok(test);
                }
            }
            let time = Local::now().timestamp_millis() - start;
            if stop.load(Ordering::Relaxed) || time > time_max {
                log::debug!("Failed generation in {} tries after {} ms", try_times, time);
                return Err(PrimeError::Timeout(time));
            }
        }
    }
}

impl PrimeSource for MillerRabin {
    fn probable_prime(&mut self, bits: u64) -> Result<BigUint, PrimeError> {
        if bits < 2 { return Err(PrimeError::TooFewBits(bits)); }
        loop {
            let stop = AtomicBool::new(false);
            let (tx, rx) = bounded(self.threads);
            let found = thread::scope(|scope| {
                for _ in 0..self.threads {
                    let tx = tx.clone();
                    let stop = &stop;
                    let (rounds, time_max) = (self.rounds, self.time_max);
                    scope.spawn(move || {
                        let _ = tx.send(MillerRabin::generate_one_prime(bits, rounds, time_max, stop));
                    });
                }
                drop(tx);
                let mut found = None;
                for res in rx.iter() {
                    if let Ok(prime) = res {
                        found = Some(prime);
                        stop.store(true, Ordering::Relaxed);
                        break;
                    }
                }
                found
            });
            match found {
                Some(prime) => return Ok(prime),
                None if self.retry => log::debug!("Retry generating {}-bit prime", bits),
                None => return Err(PrimeError::Timeout(self.time_max)),
            }
        }
    }

    fn secure_random_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        rand::thread_rng().fill_bytes(&mut buf);
        buf
    }
}
