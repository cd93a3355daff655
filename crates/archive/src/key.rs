use chrono::NaiveDate;
use common::SaleId;

/// Returns the archive key for a sale: `sales/<YYYYMMDD>/<id>.json`.
pub fn sale_key(id: &SaleId, day: NaiveDate) -> String {
    format!("sales/{}/{}.json", day.format("%Y%m%d"), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_partitioned_by_day() {
        let day = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        assert_eq!(
            sale_key(&SaleId::from("abc"), day),
            "sales/20231114/abc.json"
        );
    }

    #[test]
    fn test_key_pads_month_and_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(sale_key(&SaleId::from("x"), day), "sales/20240105/x.json");
    }
}
