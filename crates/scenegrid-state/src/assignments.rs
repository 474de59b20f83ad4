//! Assignment Store: automatic scenario assignments, unique per (tenant, scenario).

use tracing::debug;

use crate::error::StateResult;
use crate::store::Tx;
use crate::tables::ASSIGNMENTS;
use crate::types::{Assignment, Page, PageInfo};

impl Tx {
    /// Store a new assignment. The table key is the uniqueness constraint,
    /// so a second assignment for the same scenario fails with `NotUnique`.
    pub fn create_assignment(&self, assignment: &Assignment) -> StateResult<()> {
        let key = assignment.table_key();
        self.insert_new_json(ASSIGNMENTS, &key, assignment)?;
        debug!(%key, target = %assignment.target_tenant_id, "assignment created");
        Ok(())
    }

    pub fn get_assignment_for_scenario(
        &self,
        tenant: &str,
        scenario_name: &str,
    ) -> StateResult<Option<Assignment>> {
        self.get_json(ASSIGNMENTS, &format!("{tenant}/{scenario_name}"))
    }

    /// All assignments owned by a tenant, ordered by scenario name.
    pub fn list_assignments_for_tenant(&self, tenant: &str) -> StateResult<Vec<Assignment>> {
        Ok(self
            .scan_prefix::<Assignment>(ASSIGNMENTS, &format!("{tenant}/"))?
            .into_iter()
            .map(|(_, a)| a)
            .collect())
    }

    /// Assignments owned by `tenant` that target `target_tenant`.
    pub fn list_assignments_for_target_tenant(
        &self,
        tenant: &str,
        target_tenant: &str,
    ) -> StateResult<Vec<Assignment>> {
        Ok(self
            .list_assignments_for_tenant(tenant)?
            .into_iter()
            .filter(|a| a.target_tenant_id == target_tenant)
            .collect())
    }

    /// One page of a tenant's assignments. `cursor` is the last scenario
    /// name of the previous page.
    pub fn list_assignments_page(
        &self,
        tenant: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> StateResult<Page<Assignment>> {
        let all = self.list_assignments_for_tenant(tenant)?;
        let total_count = all.len();
        let mut rest: Vec<Assignment> = all
            .into_iter()
            .filter(|a| cursor.is_none_or(|c| a.scenario_name.as_str() > c))
            .collect();
        let has_next_page = rest.len() > page_size;
        rest.truncate(page_size);

        let start_cursor = cursor.unwrap_or_default().to_string();
        let end_cursor = rest
            .last()
            .map(|a| a.scenario_name.clone())
            .unwrap_or_default();
        Ok(Page {
            data: rest,
            page_info: PageInfo {
                start_cursor,
                end_cursor,
                has_next_page,
            },
            total_count,
        })
    }

    /// Delete the assignment of a scenario. Returns true if it existed.
    pub fn delete_assignment_for_scenario(
        &self,
        tenant: &str,
        scenario_name: &str,
    ) -> StateResult<bool> {
        let key = format!("{tenant}/{scenario_name}");
        let existed = self.remove_key(ASSIGNMENTS, &key)?;
        debug!(%key, existed, "assignment deleted");
        Ok(existed)
    }

    /// Delete every assignment of `tenant` targeting `target_tenant`.
    /// Returns number deleted.
    pub fn delete_assignments_for_target_tenant(
        &self,
        tenant: &str,
        target_tenant: &str,
    ) -> StateResult<u32> {
        let keys: Vec<String> = self
            .list_assignments_for_target_tenant(tenant, target_tenant)?
            .iter()
            .map(Assignment::table_key)
            .collect();
        let count = self.remove_keys(ASSIGNMENTS, &keys)?;
        debug!(%tenant, %target_tenant, count, "assignments deleted for target tenant");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::store::StateStore;
    use crate::types::LabelSelector;

    fn test_assignment(tenant: &str, scenario: &str, target: &str) -> Assignment {
        Assignment {
            scenario_name: scenario.to_string(),
            tenant: tenant.to_string(),
            selector: LabelSelector {
                key: "global_subaccount_id".to_string(),
                value: target.to_string(),
            },
            target_tenant_id: target.to_string(),
        }
    }

    #[test]
    fn assignment_create_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        let a = test_assignment("t1", "beta", "sub-1");

        tx.create_assignment(&a).unwrap();
        assert_eq!(tx.get_assignment_for_scenario("t1", "beta").unwrap(), Some(a));
        assert!(tx.get_assignment_for_scenario("t2", "beta").unwrap().is_none());
    }

    #[test]
    fn assignment_duplicate_scenario_is_not_unique() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.create_assignment(&test_assignment("t1", "beta", "sub-1"))
            .unwrap();

        let err = tx
            .create_assignment(&test_assignment("t1", "beta", "sub-2"))
            .unwrap_err();
        assert!(matches!(err, StateError::NotUnique(_)));
        let kept = tx.get_assignment_for_scenario("t1", "beta").unwrap().unwrap();
        assert_eq!(kept.target_tenant_id, "sub-1");
    }

    #[test]
    fn assignment_list_for_target_tenant() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.create_assignment(&test_assignment("t1", "a", "sub-1")).unwrap();
        tx.create_assignment(&test_assignment("t1", "b", "sub-1")).unwrap();
        tx.create_assignment(&test_assignment("t1", "c", "sub-2")).unwrap();
        tx.create_assignment(&test_assignment("t2", "d", "sub-1")).unwrap();

        assert_eq!(tx.list_assignments_for_tenant("t1").unwrap().len(), 3);
        assert_eq!(
            tx.list_assignments_for_target_tenant("t1", "sub-1").unwrap().len(),
            2
        );
    }

    #[test]
    fn assignment_pages_follow_cursor() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        for name in ["a", "b", "c"] {
            tx.create_assignment(&test_assignment("t1", name, "sub-1"))
                .unwrap();
        }

        let first = tx.list_assignments_page("t1", 2, None).unwrap();
        assert_eq!(first.data.len(), 2);
        assert_eq!(first.total_count, 3);
        assert!(first.page_info.has_next_page);
        assert_eq!(first.page_info.end_cursor, "b");

        let second = tx
            .list_assignments_page("t1", 2, Some(&first.page_info.end_cursor))
            .unwrap();
        assert_eq!(second.data.len(), 1);
        assert_eq!(second.data[0].scenario_name, "c");
        assert!(!second.page_info.has_next_page);
    }

    #[test]
    fn assignment_delete_single_and_by_target() {
        let store = StateStore::open_in_memory().unwrap();
        let tx = store.begin().unwrap();
        tx.create_assignment(&test_assignment("t1", "a", "sub-1")).unwrap();
        tx.create_assignment(&test_assignment("t1", "b", "sub-1")).unwrap();
        tx.create_assignment(&test_assignment("t1", "c", "sub-2")).unwrap();

        assert!(tx.delete_assignment_for_scenario("t1", "c").unwrap());
        assert!(!tx.delete_assignment_for_scenario("t1", "c").unwrap());
        assert_eq!(tx.delete_assignments_for_target_tenant("t1", "sub-1").unwrap(), 2);
        assert!(tx.list_assignments_for_tenant("t1").unwrap().is_empty());
    }
}
