//! Pure id-keyed list folds used by the issues reducer.

use issuedesk_api::Issue;

/// Inserts a freshly created issue at the head of the list, without re-sorting.
pub fn prepend(list: &mut Vec<Issue>, issue: Issue) {
    list.insert(0, issue);
}

/// Replaces the entry with the same id in place. Returns false if the id is not listed.
pub fn replace_by_id(list: &mut [Issue], issue: &Issue) -> bool {
    match list.iter_mut().find(|entry| entry.id == issue.id) {
        Some(entry) => {
            *entry = issue.clone();
            true
        }
        None => false,
    }
}

/// Drops every entry with the given id. Returns false if nothing was removed.
pub fn remove_by_id(list: &mut Vec<Issue>, id: &str) -> bool {
    let before = list.len();
    list.retain(|entry| entry.id != id);
    list.len() != before
}


#[cfg(test)]
mod tests {
    use super::fixtures::issue;
    use super::*;

    #[test]
    fn prepend_puts_new_issue_first() {
        let mut list = vec![issue("a", "A"), issue("b", "B")];
        prepend(&mut list, issue("c", "C"));
        let ids: Vec<_> = list.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut list = vec![issue("a", "A"), issue("b", "B")];
        assert!(replace_by_id(&mut list, &issue("b", "B2")));
        assert_eq!(list[1].title, "B2");
        assert!(!replace_by_id(&mut list, &issue("z", "Z")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_reports_whether_anything_changed() {
        let mut list = vec![issue("a", "A"), issue("b", "B")];
        assert!(remove_by_id(&mut list, "a"));
        assert!(!remove_by_id(&mut list, "a"));
        assert_eq!(list.len(), 1);
    }
}
