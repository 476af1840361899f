use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::error::StatError;
use crate::time_entry::{Client, Project, TimeEntry};
use crate::toggl::TogglRepository;

type Slots<T> = Mutex<HashMap<i64, Arc<OnceCell<T>>>>;

/// プロジェクトが解決されたtime entry。
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEntry {
    pub entry: TimeEntry,
    pub project_name: String,
    pub client_name: Option<String>,
}

/// プロジェクトとクライアントをidごとにキャッシュする。
///
/// 一度取得したレコードはプロセスが終了するまで保持し、再取得しない。
/// 同じidへの同時アクセスでは取得は1回だけ行われ、異なるidは互いを待たない。
#[derive(Debug, Default)]
pub struct ProjectDirectory {
    projects: Slots<Project>,
    clients: Slots<Client>,
}

impl ProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// time entryすべてのプロジェクトとクライアントを解決する。
    ///
    /// 1つでもプロジェクトが解決できなければエラーを返す。
    pub async fn resolve_all<T: TogglRepository + ?Sized>(
        &self,
        toggl_client: &T,
        entries: &[TimeEntry],
    ) -> Result<Vec<ResolvedEntry>, StatError> {
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            resolved.push(self.resolve(toggl_client, entry).await?);
        }
        Ok(resolved)
    }

    /// time entryのプロジェクト名とクライアント名を解決する。
    pub async fn resolve<T: TogglRepository + ?Sized>(
        &self,
        toggl_client: &T,
        entry: &TimeEntry,
    ) -> Result<ResolvedEntry, StatError> {
        let project_id = entry
            .project_id
            .filter(|id| *id != 0)
            .ok_or(StatError::MissingProject {
                entry_id: entry.id,
                start: entry.start,
            })?;
        let project = self
            .project(toggl_client, entry.workspace_id, project_id)
            .await?;
        let client_name = match project.client_id.filter(|id| *id != 0) {
            Some(client_id) => Some(
                self.client(toggl_client, project.workspace_id, client_id)
                    .await?
                    .name,
            ),
            None => None,
        };

        Ok(ResolvedEntry {
            entry: entry.clone(),
            project_name: project.name,
            client_name,
        })
    }

    /// プロジェクトを返す。キャッシュになければ取得する。
    pub async fn project<T: TogglRepository + ?Sized>(
        &self,
        toggl_client: &T,
        workspace_id: i64,
        project_id: i64,
    ) -> Result<Project, StatError> {
        let slot = slot(&self.projects, project_id);
        let project = slot
            .get_or_try_init(|| async {
                let project = toggl_client.read_project(workspace_id, project_id).await?;
                if project.name.is_empty() {
                    return Err(StatError::DataInconsistency {
                        kind: "project",
                        id: project_id,
                    });
                }
                Ok::<_, StatError>(project)
            })
            .await?;
        Ok(project.clone())
    }

    /// クライアントを返す。キャッシュになければ取得する。
    pub async fn client<T: TogglRepository + ?Sized>(
        &self,
        toggl_client: &T,
        workspace_id: i64,
        client_id: i64,
    ) -> Result<Client, StatError> {
        let slot = slot(&self.clients, client_id);
        let client = slot
            .get_or_try_init(|| async {
                let client = toggl_client.read_client(workspace_id, client_id).await?;
                if client.name.is_empty() {
                    return Err(StatError::DataInconsistency {
                        kind: "client",
                        id: client_id,
                    });
                }
                Ok::<_, StatError>(client)
            })
            .await?;
        Ok(client.clone())
    }

    /// キャッシュ済みのプロジェクト数を返す。
    pub fn cached_projects(&self) -> usize {
        filled(&self.projects)
    }

    /// キャッシュ済みのクライアント数を返す。
    pub fn cached_clients(&self) -> usize {
        filled(&self.clients)
    }
}

/// idに対応するセルを返す。ロックはawaitをまたいで保持しない。
fn slot<T>(slots: &Slots<T>, id: i64) -> Arc<OnceCell<T>> {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    slots.entry(id).or_default().clone()
}

fn filled<T>(slots: &Slots<T>) -> usize {
    slots
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .filter(|cell| cell.initialized())
        .count()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::eq;
    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout};

    use super::{ProjectDirectory, ResolvedEntry};
    use crate::error::StatError;
    use crate::time_entry::{Client, Project, TimeEntry};
    use crate::toggl::{MockTogglRepository, TogglRepository};

    /// 取得に時間がかかるリポジトリ。
    ///
    /// `blocked_project`の取得は`release`が通知されるまで完了しない。
    #[derive(Default)]
    struct SlowToggl {
        project_reads: AtomicUsize,
        blocked_project: Option<i64>,
        release: Notify,
    }

    #[async_trait]
    impl TogglRepository for SlowToggl {
        async fn read_time_entries(
            &self,
            _start_at: &DateTime<Utc>,
            _end_at: &DateTime<Utc>,
        ) -> Result<Vec<TimeEntry>, StatError> {
            Ok(vec![])
        }

        async fn read_project(
            &self,
            workspace_id: i64,
            project_id: i64,
        ) -> Result<Project, StatError> {
            self.project_reads.fetch_add(1, Ordering::SeqCst);
            if self.blocked_project == Some(project_id) {
                self.release.notified().await;
            } else {
                sleep(StdDuration::from_millis(50)).await;
            }
            Ok(Project {
                id: project_id,
                workspace_id,
                client_id: None,
                name: format!("Project {}", project_id),
            })
        }

        async fn read_client(&self, _workspace_id: i64, client_id: i64) -> Result<Client, StatError> {
            Ok(Client {
                id: client_id,
                name: "ACME".to_string(),
            })
        }
    }

    fn entry(id: i64, project_id: Option<i64>) -> TimeEntry {
        TimeEntry {
            id,
            workspace_id: 10,
            project_id,
            start: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
            duration: 3600,
            billable: false,
            description: String::new(),
        }
    }

    fn project(id: i64, client_id: Option<i64>, name: &str) -> Project {
        Project {
            id,
            workspace_id: 10,
            client_id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_caches_projects_and_clients() {
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_project()
            .with(eq(10), eq(100))
            .times(1)
            .returning(|_, id| Ok(project(id, Some(7), "Website")));
        toggl
            .expect_read_client()
            .with(eq(10), eq(7))
            .times(1)
            .returning(|_, id| {
                Ok(Client {
                    id,
                    name: "ACME".to_string(),
                })
            });

        let directory = ProjectDirectory::new();
        let entries = vec![entry(1, Some(100)), entry(2, Some(100))];
        let first = directory.resolve_all(&toggl, &entries).await.unwrap();
        let second = directory.resolve_all(&toggl, &entries).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first[0],
            ResolvedEntry {
                entry: entry(1, Some(100)),
                project_name: "Website".to_string(),
                client_name: Some("ACME".to_string()),
            }
        );
        assert_eq!(directory.cached_projects(), 1);
        assert_eq!(directory.cached_clients(), 1);
    }

    #[tokio::test]
    async fn test_project_without_client() {
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_project()
            .returning(|_, id| Ok(project(id, None, "Side project")));
        toggl.expect_read_client().never();

        let directory = ProjectDirectory::new();
        let resolved = directory.resolve(&toggl, &entry(1, Some(5))).await.unwrap();

        assert_eq!(resolved.project_name, "Side project");
        assert_eq!(resolved.client_name, None);
    }

    #[tokio::test]
    async fn test_missing_project_is_an_error() {
        let mut toggl = MockTogglRepository::new();
        toggl.expect_read_project().never();

        let directory = ProjectDirectory::new();

        for project_id in [None, Some(0)] {
            let result = directory
                .resolve_all(&toggl, &[entry(3, project_id)])
                .await;
            assert!(matches!(
                result,
                Err(StatError::MissingProject { entry_id: 3, .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_empty_project_name_is_inconsistent() {
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_project()
            .returning(|_, id| Ok(project(id, None, "")));

        let directory = ProjectDirectory::new();
        let result = directory.resolve(&toggl, &entry(1, Some(5))).await;

        assert!(matches!(
            result,
            Err(StatError::DataInconsistency {
                kind: "project",
                id: 5
            })
        ));
        assert_eq!(directory.cached_projects(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_on_next_call() {
        let mut toggl = MockTogglRepository::new();
        let mut calls = 0;
        toggl.expect_read_project().times(2).returning(move |_, id| {
            calls += 1;
            if calls == 1 {
                Err(StatError::unavailable("projects", "timeout"))
            } else {
                Ok(project(id, None, "Website"))
            }
        });

        let directory = ProjectDirectory::new();

        assert!(directory.project(&toggl, 10, 100).await.is_err());
        assert_eq!(directory.project(&toggl, 10, 100).await.unwrap().name, "Website");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_of_same_project_fetch_once() {
        let toggl = SlowToggl::default();
        let directory = ProjectDirectory::new();

        let (a, b, c, d) = tokio::join!(
            directory.project(&toggl, 10, 100),
            directory.project(&toggl, 10, 100),
            directory.project(&toggl, 10, 100),
            directory.project(&toggl, 10, 100),
        );

        assert_eq!(toggl.project_reads.load(Ordering::SeqCst), 1);
        for project in [a, b, c, d] {
            assert_eq!(project.unwrap().name, "Project 100");
        }
        assert_eq!(directory.cached_projects(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_projects_do_not_wait_for_each_other() {
        let toggl = SlowToggl {
            blocked_project: Some(100),
            ..SlowToggl::default()
        };
        let directory = ProjectDirectory::new();

        // 100の取得は200の取得が終わるまで完了しない
        let blocked = directory.project(&toggl, 10, 100);
        let other = async {
            let project = directory.project(&toggl, 10, 200).await;
            toggl.release.notify_one();
            project
        };
        let (blocked, other) = timeout(StdDuration::from_secs(5), async {
            tokio::join!(blocked, other)
        })
        .await
        .unwrap();

        assert_eq!(blocked.unwrap().name, "Project 100");
        assert_eq!(other.unwrap().name, "Project 200");
        assert_eq!(toggl.project_reads.load(Ordering::SeqCst), 2);
    }
}
