//! Tax schedules shipped with the engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{Rebates, TaxBracket, TaxSchedule};

fn bracket(
    id: &str,
    from_amount: Decimal,
    to_amount: Option<Decimal>,
    rate: Decimal,
    base_amount: Decimal,
    description: &str,
) -> TaxBracket {
    TaxBracket {
        id: id.to_string(),
        from_amount,
        to_amount,
        rate,
        base_amount,
        description: description.to_string(),
    }
}

pub fn south_africa_2025() -> TaxSchedule {
    TaxSchedule {
        id: "za-2025".to_string(),
        name: "South Africa 2025".to_string(),
        country: "South Africa".to_string(),
        tax_year: "2025".to_string(),
        brackets: vec![
            bracket("1", dec!(0), Some(dec!(237100)), dec!(18), dec!(0), "First bracket"),
            bracket("2", dec!(237101), Some(dec!(370500)), dec!(26), dec!(42678), "Second bracket"),
            bracket("3", dec!(370501), Some(dec!(512800)), dec!(31), dec!(77362), "Third bracket"),
            bracket("4", dec!(512801), Some(dec!(673000)), dec!(36), dec!(121475), "Fourth bracket"),
            bracket("5", dec!(673001), Some(dec!(857900)), dec!(39), dec!(179147), "Fifth bracket"),
            bracket("6", dec!(857901), Some(dec!(1817000)), dec!(41), dec!(251258), "Sixth bracket"),
            bracket("7", dec!(1817001), None, dec!(45), dec!(644489), "Seventh bracket"),
        ],
        rebates: Some(Rebates {
            primary: dec!(17235),
            secondary: Some(dec!(9444)),
            tertiary: Some(dec!(3145)),
            medical_aid: Some(dec!(347)),
        }),
    }
}

pub fn namibia_2025() -> TaxSchedule {
    TaxSchedule {
        id: "na-2025".to_string(),
        name: "Namibia 2025".to_string(),
        country: "Namibia".to_string(),
        tax_year: "2025".to_string(),
        brackets: vec![
            bracket("1", dec!(0), Some(dec!(50000)), dec!(0), dec!(0), "Tax exempt"),
            bracket("2", dec!(50001), Some(dec!(100000)), dec!(18), dec!(0), "First bracket"),
            bracket("3", dec!(100001), Some(dec!(300000)), dec!(25), dec!(9000), "Second bracket"),
            bracket("4", dec!(300001), Some(dec!(500000)), dec!(28), dec!(59000), "Third bracket"),
            bracket("5", dec!(500001), Some(dec!(800000)), dec!(30), dec!(115000), "Fourth bracket"),
            bracket("6", dec!(800001), Some(dec!(1500000)), dec!(32), dec!(205000), "Fifth bracket"),
            bracket("7", dec!(1500001), None, dec!(37), dec!(429000), "Sixth bracket"),
        ],
        rebates: None,
    }
}

pub fn builtin_schedules() -> Vec<TaxSchedule> {
    vec![south_africa_2025(), namibia_2025()]
}
