use super::Database;
use crate::error::CrmResult;

impl Database {
    pub fn get_setting(&self, key: &str) -> CrmResult<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM app_settings WHERE key = ?",
            [key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> CrmResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> CrmResult<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM app_settings WHERE key = ?", [key])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_crud() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.get_setting("facebook_app_id").unwrap(), None);

        db.set_setting("facebook_app_id", "123").unwrap();
        db.set_setting("facebook_app_id", "456").unwrap();
        assert_eq!(
            db.get_setting("facebook_app_id").unwrap(),
            Some("456".to_string())
        );

        assert!(db.delete_setting("facebook_app_id").unwrap());
        assert!(!db.delete_setting("facebook_app_id").unwrap());
    }
}
