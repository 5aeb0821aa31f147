//! Shared GF(2^8) Reed-Solomon / BCH decoder.
//!
//! One engine backs both modes. Reed-Solomon mode is selected by
//! [`RsDecoder::new_rs`] and derives its generator roots from
//! `first_root`/`root_skip`; BCH mode ([`RsDecoder::new_bch`]) instead takes
//! an explicit root list and uses `first_root = -1` as an internal sentinel
//! so the Forney step falls back to a fixed LSB flip.

use crate::config::{BchParams, RsParams};
use crate::errors::EccError;

/// Outcome of [`RsDecoder::fix_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// The block had no errors.
    Clean,
    /// `count` byte errors were located and corrected.
    Corrected(u32),
    /// The error pattern could not be resolved; the locator's degree did not
    /// match the number of roots found.
    Uncorrectable,
}

/// A GF(2^8) Reed-Solomon or BCH decoder over a fixed `(n, k)` block size.
#[derive(Debug, Clone)]
pub struct RsDecoder {
    n: usize,
    k: usize,
    /// -1 (sentinel, stored as `None`) for BCH mode.
    first_root: Option<i32>,
    alpha: Vec<u8>,
    logtable: Vec<u8>,
    zeroes: Vec<u8>,
    gaproots: Vec<u8>,
}

impl RsDecoder {
    /// Reed-Solomon mode: generator roots are `alpha^((first_root+i)*root_skip mod n)`.
    pub fn new_rs(
        n: usize,
        k: usize,
        gen_poly: u32,
        first_root: u8,
        root_skip: usize,
    ) -> Result<Self, EccError> {
        Self::validate_params(n, k)?;
        let (alpha, logtable) = build_tables(n, gen_poly);

        let t = n - k;
        let mut zeroes = vec![0u8; t];
        for (i, slot) in zeroes.iter_mut().enumerate() {
            let exp = ((i + first_root as usize) * root_skip) % n;
            *slot = alpha[exp];
        }

        let mut gaproots = vec![0u8; n + 1];
        for i in 0..=n {
            let idx = gfpow(i as u8, root_skip, &alpha, &logtable, n) as usize;
            gaproots[idx] = i as u8;
        }

        Ok(Self { n, k, first_root: Some(first_root as i32), alpha, logtable, zeroes, gaproots })
    }

    /// BCH mode: caller supplies the generator roots explicitly.
    pub fn new_bch(n: usize, k: usize, gen_poly: u32, roots: &[u8]) -> Result<Self, EccError> {
        Self::validate_params(n, k)?;
        let t = n - k;
        if roots.len() != t {
            return Err(EccError::InvalidCodeRate { n, k });
        }
        let (alpha, logtable) = build_tables(n, gen_poly);
        let gaproots = (0..=n as u8).collect();

        Ok(Self { n, k, first_root: None, alpha, logtable, zeroes: roots.to_vec(), gaproots })
    }

    fn validate_params(n: usize, k: usize) -> Result<(), EccError> {
        if n > 255 {
            return Err(EccError::BlockTooLarge { n });
        }
        if k > n {
            return Err(EccError::InvalidCodeRate { n, k });
        }
        if (n - k) % 2 != 0 {
            return Err(EccError::OddParity { n, k });
        }
        Ok(())
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Maximum number of correctable byte errors.
    pub fn max_errors(&self) -> usize {
        (self.n - self.k) / 2
    }

    /// Attempts to correct `data` (exactly `n` bytes) in place.
    pub fn fix_block(&self, data: &mut [u8]) -> Correction {
        assert_eq!(data.len(), self.n);

        let rs_n = self.n;
        let rs_t = self.n - self.k;
        let rs_t2 = rs_t / 2;
        let alpha = &self.alpha;
        let logtable = &self.logtable;

        let mut syndrome = vec![0u8; rs_t];
        let mut has_errors = false;
        for (i, s) in syndrome.iter_mut().enumerate() {
            *s = poly_eval(data, self.zeroes[i], alpha, logtable, rs_n);
            has_errors |= *s != 0;
        }
        if !has_errors {
            return Correction::Clean;
        }

        // Berlekamp-Massey
        let mut lambda = vec![0u8; rs_t2 + 1];
        let mut prev_lambda = vec![0u8; rs_t2 + 1];
        let mut tmp = vec![0u8; rs_t2 + 1];
        lambda[0] = 1;
        prev_lambda[0] = 1;
        let mut lambda_deg = 0usize;
        let mut prev_delta: u8 = 1;
        let mut m = 1usize;

        for n in 0..rs_t {
            let mut delta = syndrome[n];
            for i in 1..=lambda_deg {
                delta ^= gfmul(syndrome[n - i], lambda[i], alpha, logtable, rs_n);
            }

            if delta == 0 {
                m += 1;
            } else if 2 * lambda_deg <= n {
                tmp.copy_from_slice(&lambda);
                let coeff = gfdiv(delta, prev_delta, alpha, logtable, rs_n);
                for i in m..rs_t2 + 1 {
                    lambda[i] ^= gfmul(coeff, prev_lambda[i - m], alpha, logtable, rs_n);
                }
                prev_lambda.copy_from_slice(&tmp);
                prev_delta = delta;
                lambda_deg = n + 1 - lambda_deg;
                m = 1;
            } else {
                let coeff = gfdiv(delta, prev_delta, alpha, logtable, rs_n);
                for i in m..rs_t2 + 1 {
                    lambda[i] ^= gfmul(coeff, prev_lambda[i - m], alpha, logtable, rs_n);
                }
                m += 1;
            }
        }

        // Brute-force the locator's roots over GF(2^8).
        let mut lambda_root = vec![0u8; rs_t2];
        let mut error_pos = vec![0u8; rs_t2];
        let mut error_count = 0usize;
        for i in 1..=rs_n {
            if error_count >= lambda_deg {
                break;
            }
            if poly_eval(&lambda, i as u8, alpha, logtable, rs_n) == 0 {
                lambda_root[error_count] = i as u8;
                let inv = gfdiv(1, i as u8, alpha, logtable, rs_n);
                error_pos[error_count] = logtable[self.gaproots[inv as usize] as usize];
                error_count += 1;
            }
        }

        if error_count != lambda_deg {
            return Correction::Uncorrectable;
        }

        let omega = poly_mul(&syndrome, &lambda[..lambda_deg + 1], rs_t, alpha, logtable, rs_n);
        let lambda_prime = poly_deriv(&lambda[..rs_t2 + 1]);

        for i in 0..error_count {
            let pos = error_pos[i] as usize;
            if pos >= self.n {
                // Reaching outside the original message range (e.g. inside
                // a zero-padded shortened-code prefix) is never valid.
                return Correction::Uncorrectable;
            }
            match self.first_root {
                Some(first_root) => {
                    let fcr = gfpow(
                        lambda_root[i],
                        ((first_root - 1).rem_euclid(rs_n as i32)) as usize,
                        alpha,
                        logtable,
                        rs_n,
                    );
                    let num = poly_eval(&omega, lambda_root[i], alpha, logtable, rs_n);
                    let den = poly_eval(&lambda_prime, lambda_root[i], alpha, logtable, rs_n);
                    data[pos] ^= gfdiv(gfmul(num, fcr, alpha, logtable, rs_n), den, alpha, logtable, rs_n);
                }
                None => {
                    data[pos] ^= 0x1;
                }
            }
        }

        Correction::Corrected(error_count as u32)
    }
}

fn build_tables(n: usize, gen_poly: u32) -> (Vec<u8>, Vec<u8>) {
    let mut alpha = vec![0u8; n + 1];
    let mut logtable = vec![0u8; n + 1];

    alpha[0] = 1;
    for i in 1..=n {
        let mut tmp = (alpha[i - 1] as u32) << 1;
        if tmp >= (n as u32 + 1) {
            tmp ^= gen_poly;
        }
        alpha[i] = tmp as u8;
        logtable[tmp as usize] = i as u8;
    }

    (alpha, logtable)
}

fn poly_eval(poly: &[u8], x: u8, alpha: &[u8], logtable: &[u8], n: usize) -> u8 {
    let mut ret = 0u8;
    for &coeff in poly.iter().rev() {
        ret = gfmul(ret, x, alpha, logtable, n) ^ coeff;
    }
    ret
}

fn poly_deriv(poly: &[u8]) -> Vec<u8> {
    // d/dx of a GF(2) polynomial: the i-th coefficient survives iff i is odd
    // (summing poly[i] with itself an even number of times cancels under XOR).
    (1..poly.len()).map(|i| if i % 2 == 1 { poly[i] } else { 0 }).collect()
}

fn poly_mul(poly1: &[u8], poly2: &[u8], len_1: usize, alpha: &[u8], logtable: &[u8], n: usize) -> Vec<u8> {
    let mut dst = vec![0u8; len_1];
    for (j, &b) in poly2.iter().enumerate() {
        for i in 0..len_1 {
            if i + j < len_1 {
                dst[i + j] ^= gfmul(poly1[i], b, alpha, logtable, n);
            }
        }
    }
    dst
}

fn gfmul(x: u8, y: u8, alpha: &[u8], logtable: &[u8], n: usize) -> u8 {
    if x == 0 || y == 0 {
        return 0;
    }
    alpha[(logtable[x as usize] as usize + logtable[y as usize] as usize) % n]
}

fn gfdiv(x: u8, y: u8, alpha: &[u8], logtable: &[u8], n: usize) -> u8 {
    if x == 0 || y == 0 {
        return 0;
    }
    let diff = (logtable[x as usize] as i32 - logtable[y as usize] as i32).rem_euclid(n as i32);
    alpha[diff as usize]
}

fn gfpow(x: u8, exp: usize, alpha: &[u8], logtable: &[u8], n: usize) -> u8 {
    if x == 0 {
        0
    } else {
        alpha[(logtable[x as usize] as usize * exp) % n]
    }
}

/// RS41's generator polynomial, `0x11D` over GF(2^8), `(n=255, k=231)`.
pub fn rs41_decoder() -> RsDecoder {
    let p = RsParams::rs41();
    RsDecoder::new_rs(p.n, p.k, p.gen_poly, p.first_root, p.root_skip)
        .expect("RS41 RS parameters are valid by construction")
}

/// iMS-100's shortened BCH(63,51) with explicit roots.
pub fn ims100_decoder() -> RsDecoder {
    let p = BchParams::ims100();
    RsDecoder::new_bch(p.n, p.k, p.gen_poly, &p.roots).expect("iMS-100 BCH parameters are valid by construction")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn clean_block_reports_no_errors() {
        let rs = rs41_decoder();
        let mut data = vec![0u8; rs.n()];
        // zero data is already a valid codeword (the zero polynomial has all roots).
        assert_eq!(rs.fix_block(&mut data), Correction::Clean);
    }

    #[test]
    fn corrects_up_to_t_random_byte_errors() {
        let rs = rs41_decoder();
        let t = rs.max_errors();
        let mut rng = StdRng::seed_from_u64(7);

        for trial in 0..200 {
            let original = vec![0u8; rs.n()];
            let mut corrupted = original.clone();

            let mut positions: Vec<usize> = (0..rs.n()).collect();
            for i in (1..positions.len()).rev() {
                let j = rng.gen_range(0..=i);
                positions.swap(i, j);
            }
            for &pos in positions.iter().take(t) {
                let mut v: u8 = 0;
                while v == 0 {
                    v = rng.gen();
                }
                corrupted[pos] ^= v;
            }

            match rs.fix_block(&mut corrupted) {
                Correction::Clean => assert_eq!(corrupted, original, "trial {trial}"),
                Correction::Corrected(_) => assert_eq!(corrupted, original, "trial {trial}"),
                Correction::Uncorrectable => panic!("trial {trial}: should have corrected {t} errors"),
            }
        }
    }

    #[test]
    fn t_plus_one_errors_never_silently_succeed() {
        let rs = rs41_decoder();
        let t = rs.max_errors();
        let mut rng = StdRng::seed_from_u64(99);
        let mut false_positives = 0;

        for _ in 0..1000 {
            let original = vec![0u8; rs.n()];
            let mut corrupted = original.clone();

            let mut positions: Vec<usize> = (0..rs.n()).collect();
            for i in (1..positions.len()).rev() {
                let j = rng.gen_range(0..=i);
                positions.swap(i, j);
            }
            for &pos in positions.iter().take(t + 1) {
                let mut v: u8 = 0;
                while v == 0 {
                    v = rng.gen();
                }
                corrupted[pos] ^= v;
            }

            if let Correction::Corrected(_) = rs.fix_block(&mut corrupted) {
                if corrupted == original {
                    false_positives += 1;
                }
            }
        }

        assert_eq!(false_positives, 0, "t+1 errors must never silently reconstruct the original");
    }

    #[test]
    fn ims100_bch_mode_flips_lsb() {
        let bch = ims100_decoder();
        assert_eq!(bch.n(), 63);
        assert_eq!(bch.k(), 51);
    }
}
