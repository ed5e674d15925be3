use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteId;
use crate::errors::DomainError;

/// Yearly per-staff allocation: (percent, count).
pub const YEARLY_ALLOCATION: [(u8, usize); 3] = [(15, 1), (10, 3), (5, 3)];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub code: String,
    pub percent: u8,
    pub staff_id: String,
    pub year: i32,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,
    pub used_on_quote: Option<QuoteId>,
}

impl DiscountCode {
    /// Single-use: a second redemption is an invariant violation, not a
    /// silent overwrite.
    pub fn redeem(
        &mut self,
        used_by: impl Into<String>,
        quote_id: QuoteId,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.is_used {
            return Err(DomainError::DiscountCodeAlreadyUsed { code: self.code.clone() });
        }
        self.is_used = true;
        self.used_at = Some(at);
        self.used_by = Some(used_by.into());
        self.used_on_quote = Some(quote_id);
        Ok(())
    }
}

/// Generates the fixed yearly allocation for one staff member.
pub fn allocate_for_staff(
    staff_id: impl Into<String>,
    year: i32,
    rng: &mut impl Rng,
) -> Vec<DiscountCode> {
    let staff_id = staff_id.into();
    let mut codes = Vec::with_capacity(7);
    for (percent, count) in YEARLY_ALLOCATION {
        for _ in 0..count {
            codes.push(DiscountCode {
                code: generate_code(percent, rng),
                percent,
                staff_id: staff_id.clone(),
                year,
                is_used: false,
                used_at: None,
                used_by: None,
                used_on_quote: None,
            });
        }
    }
    codes
}

fn generate_code(percent: u8, rng: &mut impl Rng) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let suffix: String = (0..6)
        .map(|_| {
            let index = rng.gen_range(0..ALPHABET.len());
            ALPHABET[index] as char
        })
        .collect();
    format!("CD{percent:02}-{suffix}")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::domain::discount::{allocate_for_staff, YEARLY_ALLOCATION};
    use crate::domain::quote::QuoteId;
    use crate::errors::DomainError;

    #[test]
    fn allocation_is_one_fifteen_three_tens_three_fives() {
        let mut rng = StdRng::seed_from_u64(7);
        let codes = allocate_for_staff("staff-9", 2026, &mut rng);

        assert_eq!(codes.len(), 7);
        for (percent, count) in YEARLY_ALLOCATION {
            assert_eq!(codes.iter().filter(|code| code.percent == percent).count(), count);
        }
        assert!(codes.iter().all(|code| code.year == 2026 && !code.is_used));
    }

    #[test]
    fn redeem_is_single_use() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut code = allocate_for_staff("staff-9", 2026, &mut rng).remove(0);

        code.redeem("agent-3", QuoteId("QT-1".to_string()), Utc::now()).expect("first use");
        assert!(code.is_used);
        assert!(code.used_at.is_some());

        let error = code
            .redeem("agent-4", QuoteId("QT-2".to_string()), Utc::now())
            .expect_err("second use must fail");
        assert!(matches!(error, DomainError::DiscountCodeAlreadyUsed { .. }));
        assert_eq!(code.used_by.as_deref(), Some("agent-3"));
    }
}
