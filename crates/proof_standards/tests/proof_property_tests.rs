//! Property tests for the batch proof function:
//! - identical logical content always yields the same digest
//! - re-serializing the records does not change the digest
//! - changing any single field changes the digest

use batch_models::{BatchMeta, KycStatus, Manufacturer};
use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use proof_standards::compute_proof;

fn manufacturer(name: &str, approved: bool, secs: i64) -> Manufacturer {
    let kyc = if approved { KycStatus::Approved } else { KycStatus::Pending };
    Manufacturer::with_id("MAN_test", name, kyc, Utc.timestamp_opt(secs, 0).unwrap()).unwrap()
}

fn meta(product: &str, batch_no: &str, coa: &str, day: u32) -> BatchMeta {
    BatchMeta {
        product: product.to_string(),
        batch_no: batch_no.to_string(),
        mfg: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
        expiry: NaiveDate::from_ymd_opt(2027, 1, day).unwrap(),
        coa: coa.to_string(),
    }
}

proptest! {
    #[test]
    fn proof_is_deterministic(
        name in "[A-Za-z][A-Za-z ]{0,20}",
        product in "[A-Za-z0-9][A-Za-z0-9 ]{0,20}",
        batch_no in "[A-Z0-9-]{1,12}",
        coa in ".{0,40}",
        approved in any::<bool>(),
        secs in 1_600_000_000i64..1_900_000_000i64,
        day in 1u32..28,
    ) {
        let m = manufacturer(&name, approved, secs);
        let md = meta(&product, &batch_no, &coa, day);
        prop_assert_eq!(compute_proof(&m, &md).unwrap(), compute_proof(&m.clone(), &md.clone()).unwrap());
    }

    #[test]
    fn proof_is_stable_across_reserialization(
        name in "[A-Za-z][A-Za-z ]{0,20}",
        coa in ".{0,40}",
        secs in 1_600_000_000i64..1_900_000_000i64,
    ) {
        let m = manufacturer(&name, true, secs);
        let md = meta("Amoxicillin 500mg", "B1", &coa, 3);
        let m2: Manufacturer = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        let md2: BatchMeta = serde_json::from_str(&serde_json::to_string(&md).unwrap()).unwrap();
        prop_assert_eq!(compute_proof(&m, &md).unwrap(), compute_proof(&m2, &md2).unwrap());
    }

    #[test]
    fn single_field_change_changes_proof(
        product in "[A-Za-z]{1,12}",
        suffix in "[a-z0-9]{1,4}",
        field in 0usize..6,
    ) {
        let m = manufacturer("NovaMed Pharma", true, 1_700_000_000);
        let md = meta(&product, "B1", "coa", 5);
        let base = compute_proof(&m, &md).unwrap();

        let (m2, md2) = {
            let mut m2 = m.clone();
            let mut md2 = md.clone();
            match field {
                0 => m2.name.push_str(&suffix),
                1 => m2.kyc = m2.kyc.toggled(),
                2 => md2.product.push_str(&suffix),
                3 => md2.batch_no.push_str(&suffix),
                4 => md2.coa.push_str(&suffix),
                _ => md2.expiry = md2.expiry.succ_opt().unwrap(),
            }
            (m2, md2)
        };
        prop_assert_ne!(base, compute_proof(&m2, &md2).unwrap());
    }
}
