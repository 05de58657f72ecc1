use crate::{
    collectors::collector::{
        CollectFuture,
        Collector,
    },
    names,
    registry::{
        MetricsRegistry,
        RegistryError,
    },
};
use eyre::{
    Result,
    WrapErr,
};
use pagerduty_client::{
    ListUsersOptions,
    PagerdutyApi,
    User,
};
use prometheus::GaugeVec;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        Mutex,
    },
};

type UserLabels = [String; 7];

fn user_labels(user: &User) -> UserLabels {
    [
        user.id.clone(),
        user.name.clone(),
        user.email.clone(),
        user.avatar_url.clone(),
        user.color.clone(),
        user.job_title.clone(),
        user.role.clone(),
    ]
}

fn as_strs(labels: &UserLabels) -> [&str; 7] {
    [
        &labels[0], &labels[1], &labels[2], &labels[3], &labels[4], &labels[5], &labels[6],
    ]
}

/// Publishes `pagerduty_user{...} = 1` for every user in the account.
pub struct UsersCollector {
    client: Arc<dyn PagerdutyApi>,
    gauge: GaugeVec,
    page_limit: u32,
    prune_stale: bool,
    seen: Mutex<HashSet<UserLabels>>,
}

impl UsersCollector {
    pub fn new(client: Arc<dyn PagerdutyApi>, registry: &MetricsRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            client,
            gauge: registry.gauge_vec(names::USER, "PagerDuty user", &names::USER_LABELS)?,
            page_limit: ListUsersOptions::default().limit,
            prune_stale: false,
            seen: Mutex::new(HashSet::new()),
        })
    }

    /// Remove series of users that disappeared since the previous full refresh.
    pub fn with_prune_stale(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;
        self
    }

    async fn collect_users(&self) -> Result<()> {
        let mut options = ListUsersOptions {
            limit: self.page_limit,
            offset: 0,
        };
        let mut current = HashSet::new();

        loop {
            let page = self
                .client
                .list_users(options)
                .await
                .wrap_err_with(|| format!("listing users at offset {}", options.offset))?;

            for user in &page.users {
                let labels = user_labels(user);
                self.gauge.with_label_values(&as_strs(&labels)).set(1.0);
                current.insert(labels);
            }

            if !page.more {
                break;
            }
            options.offset += if page.limit == 0 { options.limit } else { page.limit };
        }

        debug!(users = current.len(), "users refreshed");
        self.replace_seen(current);
        Ok(())
    }

    fn replace_seen(&self, current: HashSet<UserLabels>) {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if self.prune_stale {
            for stale in seen.difference(&current) {
                match self.gauge.remove_label_values(&as_strs(stale)) {
                    Ok(()) => debug!(user_id = %stale[0], "removed stale user series"),
                    Err(e) => warn!(user_id = %stale[0], error = %e, "could not remove stale user series"),
                }
            }
        }

        *seen = current;
    }
}

impl Collector for UsersCollector {
    fn collect(&self) -> CollectFuture<'_> {
        Box::pin(self.collect_users())
    }

    fn name(&self) -> &str {
        "users"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagerduty_client::{
        ApiErrorObject,
        ApiFuture,
        ClientError,
        ListUsersResponse,
        Report,
        ServiceMetricReportParams,
        StatusCode,
    };
    use pretty_assertions::assert_eq;

    /// Serves `users` in pages, optionally failing the request at `fail_at_offset`.
    struct FakeDirectory {
        users: Mutex<Vec<User>>,
        fail_at_offset: Mutex<Option<u32>>,
        offsets: Mutex<Vec<u32>>,
    }

    impl FakeDirectory {
        fn new(count: usize) -> Self {
            Self {
                users: Mutex::new((0..count).map(user).collect()),
                fail_at_offset: Mutex::new(None),
                offsets: Mutex::new(Vec::new()),
            }
        }
    }

    fn user(i: usize) -> User {
        User {
            id: format!("PUSER{i}"),
            name: format!("User {i}"),
            email: format!("user{i}@example.com"),
            role: "user".to_string(),
            ..Default::default()
        }
    }

    impl PagerdutyApi for FakeDirectory {
        fn query_metric_report(&self, _params: ServiceMetricReportParams) -> ApiFuture<'_, Report> {
            unreachable!("users collector never queries analytics")
        }

        fn list_users(&self, options: ListUsersOptions) -> ApiFuture<'_, ListUsersResponse> {
            self.offsets.lock().unwrap().push(options.offset);
            let result = if *self.fail_at_offset.lock().unwrap() == Some(options.offset) {
                Err(ClientError::Api {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    error: ApiErrorObject::default(),
                })
            } else {
                let users = self.users.lock().unwrap();
                let start = (options.offset as usize).min(users.len());
                let end = (start + options.limit as usize).min(users.len());
                Ok(ListUsersResponse {
                    users: users[start..end].to_vec(),
                    limit: options.limit,
                    offset: options.offset,
                    more: end < users.len(),
                    total: None,
                })
            };
            Box::pin(async move { result })
        }
    }

    fn series(registry: &MetricsRegistry) -> usize {
        registry
            .encode_text()
            .unwrap()
            .lines()
            .filter(|line| line.starts_with("pagerduty_user{"))
            .count()
    }

    #[tokio::test]
    async fn follows_offsets_until_no_more_pages() {
        let registry = MetricsRegistry::default();
        let directory = Arc::new(FakeDirectory::new(250));
        let collector = UsersCollector::new(directory.clone(), &registry).unwrap();

        collector.collect().await.unwrap();

        assert_eq!(*directory.offsets.lock().unwrap(), vec![0, 100, 200]);
        assert_eq!(series(&registry), 250);
        let text = registry.encode_text().unwrap();
        assert!(text.contains(
            r#"pagerduty_user{avatar="",color="",id="PUSER42",job_title="",mail="user42@example.com",name="User 42",role="user"} 1"#
        ));
    }

    #[tokio::test]
    async fn page_failure_aborts_the_refresh() {
        let registry = MetricsRegistry::default();
        let directory = Arc::new(FakeDirectory::new(250));
        *directory.fail_at_offset.lock().unwrap() = Some(100);
        let collector = UsersCollector::new(directory.clone(), &registry).unwrap();

        let err = collector.collect().await.unwrap_err();

        assert!(err.to_string().contains("listing users at offset 100"));
        assert_eq!(*directory.offsets.lock().unwrap(), vec![0, 100]);
    }

    #[tokio::test]
    async fn stale_users_are_kept_unless_pruning_is_enabled() {
        let registry = MetricsRegistry::default();
        let directory = Arc::new(FakeDirectory::new(3));
        let collector = UsersCollector::new(directory.clone(), &registry).unwrap();

        collector.collect().await.unwrap();
        directory.users.lock().unwrap().remove(1);
        collector.collect().await.unwrap();
        assert_eq!(series(&registry), 3);

        let registry = MetricsRegistry::default();
        let directory = Arc::new(FakeDirectory::new(3));
        let collector = UsersCollector::new(directory.clone(), &registry)
            .unwrap()
            .with_prune_stale(true);

        collector.collect().await.unwrap();
        directory.users.lock().unwrap().remove(1);

        // A failed refresh leaves everything in place.
        *directory.fail_at_offset.lock().unwrap() = Some(0);
        assert!(collector.collect().await.is_err());
        assert_eq!(series(&registry), 3);

        *directory.fail_at_offset.lock().unwrap() = None;
        collector.collect().await.unwrap();
        assert_eq!(series(&registry), 2);
        assert!(!registry.encode_text().unwrap().contains("PUSER1\""));
    }
}
