use chrono::{Duration, Utc};
use pomotrack::db::Database;
use pomotrack::error::AppError;
use pomotrack::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_user(db: &Database, username: &str) -> User {
    db.create_user(username, &format!("{username}@example.com"), "phc-hash")
        .expect("Failed to create user")
}

fn create_test_task(db: &Database, user_id: Uuid) -> Task {
    db.create_task(
        user_id,
        CreateTaskInput {
            title: "Write report".to_string(),
            description: None,
            category: Category::Work,
            priority: Priority::Medium,
            due_date: None,
            alarm_offset_min: None,
        },
    )
    .expect("Failed to create task")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let user = create_test_user(&db, "alice");
    }

    describe "users" {
        describe "create_user" {
            it "rejects a duplicate username with a conflict" {
                let result = db.create_user("alice", "second@example.com", "hash");
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }

            it "rejects a duplicate email with a conflict" {
                let result = db.create_user("bob", "alice@example.com", "hash");
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }

            it "starts with a zero reward count" {
                assert_eq!(user.reward_count, 0);
            }
        }

        describe "reset_all_reward_counts" {
            it "zeroes every account" {
                let task = create_test_task(&db, user.id);
                db.makeup_checkin(user.id, task.id, Utc::now() - Duration::days(1))
                    .expect("Query failed");

                let touched = db.reset_all_reward_counts().expect("Query failed");
                assert!(touched >= 1);

                let refreshed = db.get_user(user.id).expect("Query failed").unwrap();
                assert_eq!(refreshed.reward_count, 0);
            }
        }

        describe "refresh_tokens" {
            it "stores and deletes a token" {
                db.insert_refresh_token("tok-1", user.id, Utc::now() + Duration::days(30))
                    .expect("Failed to insert");

                let found = db.get_refresh_token("tok-1").expect("Query failed");
                assert!(found.is_some());
                assert_eq!(found.unwrap().user_id, user.id);

                assert!(db.delete_refresh_token("tok-1").expect("Query failed"));
                assert!(db.get_refresh_token("tok-1").expect("Query failed").is_none());
            }

            it "deletes all tokens for a user" {
                db.insert_refresh_token("tok-1", user.id, Utc::now() + Duration::days(30))
                    .expect("Failed to insert");
                db.insert_refresh_token("tok-2", user.id, Utc::now() + Duration::days(30))
                    .expect("Failed to insert");

                let removed = db.delete_user_refresh_tokens(user.id).expect("Query failed");
                assert_eq!(removed, 2);
            }
        }
    }

    describe "tasks" {
        describe "create_task" {
            it "rejects a blank title" {
                let result = db.create_task(user.id, CreateTaskInput {
                    title: "  ".to_string(),
                    description: None,
                    category: Category::Life,
                    priority: Priority::Low,
                    due_date: None,
                    alarm_offset_min: None,
                });
                assert!(matches!(result, Err(AppError::Validation(_))));
            }

            it "initializes accumulators to zero" {
                let task = create_test_task(&db, user.id);
                assert_eq!(task.focus_time, 0);
                assert_eq!(task.pomodoro_count, 0);
                assert!(!task.completed);
                assert!(task.deleted_at.is_none());
            }
        }

        describe "get_task" {
            it "returns None for another user's task" {
                let bob = create_test_user(&db, "bob");
                let task = create_test_task(&db, user.id);
                let found = db.get_task(bob.id, task.id).expect("Query failed");
                assert!(found.is_none());
            }
        }

        describe "update_task" {
            it "changes only the provided fields" {
                let task = create_test_task(&db, user.id);
                let updated = db.update_task(user.id, task.id, UpdateTaskInput {
                    priority: Some(Priority::Urgent),
                    ..Default::default()
                }).expect("Query failed").expect("Task not found");

                assert_eq!(updated.priority, Priority::Urgent);
                assert_eq!(updated.title, "Write report");
                assert_eq!(updated.category, Category::Work);
            }

            it "writes a brief log when brief fields accompany the edit" {
                let task = create_test_task(&db, user.id);
                db.update_task(user.id, task.id, UpdateTaskInput {
                    category: Some(Category::Study),
                    brief_type: Some(BriefType::CategoryChange),
                    brief_content: Some("Moved to study".to_string()),
                    ..Default::default()
                }).expect("Query failed").expect("Task not found");

                let logs = db.list_brieflogs_by_task(user.id, task.id).expect("Query failed");
                assert_eq!(logs.len(), 1);
                assert_eq!(logs[0].brief_type, BriefType::CategoryChange);
            }

            it "rejects a brief type without content" {
                let task = create_test_task(&db, user.id);
                let result = db.update_task(user.id, task.id, UpdateTaskInput {
                    brief_type: Some(BriefType::Reflection),
                    ..Default::default()
                });
                assert!(matches!(result, Err(AppError::Validation(_))));
            }
        }

        describe "complete_task" {
            it "sets the completion timestamp" {
                let task = create_test_task(&db, user.id);
                let completed = db.complete_task(user.id, task.id)
                    .expect("Query failed").expect("Task not found");
                assert!(completed.completed);
                assert!(completed.completed_at.is_some());
            }

            it "conflicts when already completed" {
                let task = create_test_task(&db, user.id);
                db.complete_task(user.id, task.id).expect("Query failed");
                let result = db.complete_task(user.id, task.id);
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }
        }

        describe "makeup_checkin" {
            it "completes the task with the supplied past date" {
                let task = create_test_task(&db, user.id);
                let when = Utc::now() - Duration::days(2);
                let done = db.makeup_checkin(user.id, task.id, when)
                    .expect("Query failed").expect("Task not found");
                assert!(done.completed);
                assert_eq!(done.completed_at, Some(when));

                let refreshed = db.get_user(user.id).expect("Query failed").unwrap();
                assert_eq!(refreshed.reward_count, 1);
            }

            it "rejects a future date" {
                let task = create_test_task(&db, user.id);
                let result = db.makeup_checkin(user.id, task.id, Utc::now() + Duration::days(1));
                assert!(matches!(result, Err(AppError::Validation(_))));
            }

            it "conflicts once the monthly quota of two is used" {
                let a = create_test_task(&db, user.id);
                let b = create_test_task(&db, user.id);
                let c = create_test_task(&db, user.id);
                let when = Utc::now() - Duration::days(1);

                db.makeup_checkin(user.id, a.id, when).expect("Query failed");
                db.makeup_checkin(user.id, b.id, when).expect("Query failed");
                let result = db.makeup_checkin(user.id, c.id, when);
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }
        }

        describe "soft_delete_task" {
            it "hides the task from live listings but keeps the row" {
                let task = create_test_task(&db, user.id);
                assert!(db.soft_delete_task(user.id, task.id, None).expect("Query failed"));

                assert!(db.get_task(user.id, task.id).expect("Query failed").is_none());
                assert!(db.get_task_any(user.id, task.id).expect("Query failed").is_some());

                let archived = db.list_archived_tasks(user.id).expect("Query failed");
                assert_eq!(archived.len(), 1);
            }

            it "drops an open session on the task" {
                let task = create_test_task(&db, user.id);
                db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: Some(task.id),
                    duration_minutes: 25,
                }).expect("Failed to create session");

                db.soft_delete_task(user.id, task.id, None).expect("Query failed");

                let active = db.get_active_pomodoro(user.id).expect("Query failed");
                assert!(active.is_none());
            }

            it "records the reason as a delete brief log" {
                let task = create_test_task(&db, user.id);
                db.soft_delete_task(user.id, task.id, Some("Obsolete".to_string()))
                    .expect("Query failed");

                let logs = db.list_brieflogs_by_task(user.id, task.id).expect("Query failed");
                assert_eq!(logs.len(), 1);
                assert_eq!(logs[0].brief_type, BriefType::DeleteReason);
                assert_eq!(logs[0].content, "Obsolete");
            }
        }

        describe "purge_task" {
            it "removes the row but keeps its brief logs" {
                let task = create_test_task(&db, user.id);
                db.create_brieflog(user.id, CreateBriefLogInput {
                    task_id: task.id,
                    brief_type: BriefType::Reflection,
                    content: "Note".to_string(),
                }).expect("Failed to create log");

                assert!(db.purge_task(user.id, task.id).expect("Query failed"));
                assert!(db.get_task_any(user.id, task.id).expect("Query failed").is_none());

                let logs = db.list_brieflogs(user.id).expect("Query failed");
                assert_eq!(logs.len(), 1);
            }
        }

        describe "batch_delete_tasks" {
            it "soft-deletes each listed task and skips foreign ids" {
                let a = create_test_task(&db, user.id);
                let b = create_test_task(&db, user.id);
                let bob = create_test_user(&db, "bob");
                let theirs = create_test_task(&db, bob.id);

                let deleted = db.batch_delete_tasks(user.id, &[a.id, b.id, theirs.id])
                    .expect("Query failed");
                assert_eq!(deleted, 2);

                // Bob's task is untouched.
                assert!(db.get_task(bob.id, theirs.id).expect("Query failed").is_some());
            }
        }

        describe "search_tasks" {
            it "escapes SQL LIKE wildcards in the query" {
                create_test_task(&db, user.id);
                let found = db.search_tasks(user.id, "%").expect("Query failed");
                assert!(found.is_empty());
            }
        }

        describe "due date queries" {
            it "partitions upcoming and overdue by now" {
                db.create_task(user.id, CreateTaskInput {
                    title: "Past due".to_string(),
                    description: None,
                    category: Category::Work,
                    priority: Priority::High,
                    due_date: Some(Utc::now() - Duration::hours(2)),
                    alarm_offset_min: None,
                }).expect("Failed to create");
                db.create_task(user.id, CreateTaskInput {
                    title: "Due tomorrow".to_string(),
                    description: None,
                    category: Category::Work,
                    priority: Priority::High,
                    due_date: Some(Utc::now() + Duration::days(1)),
                    alarm_offset_min: None,
                }).expect("Failed to create");

                let upcoming = db.upcoming_tasks(user.id).expect("Query failed");
                assert_eq!(upcoming.len(), 1);
                assert_eq!(upcoming[0].title, "Due tomorrow");

                let overdue = db.overdue_tasks(user.id).expect("Query failed");
                assert_eq!(overdue.len(), 1);
                assert_eq!(overdue[0].title, "Past due");
            }
        }
    }

    describe "pomodoro_sessions" {
        describe "create_pomodoro" {
            it "conflicts while another session is open" {
                db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");

                let result = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                });
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }

            it "allows a new session after the previous one closes" {
                let first = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                db.end_pomodoro(user.id, first.id).expect("Query failed");

                let second = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                });
                assert!(second.is_ok());
            }

            it "does not block other users" {
                let bob = create_test_user(&db, "bob");
                db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");

                let result = db.create_pomodoro(bob.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                });
                assert!(result.is_ok());
            }

            it "rejects a session on a missing task" {
                let result = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: Some(Uuid::new_v4()),
                    duration_minutes: 25,
                });
                assert!(matches!(result, Err(AppError::NotFound(_))));
            }
        }

        describe "complete_pomodoro" {
            it "rolls planned minutes into the task accumulators" {
                let task = create_test_task(&db, user.id);
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: Some(task.id),
                    duration_minutes: 25,
                }).expect("Failed to create");

                let done = db.complete_pomodoro(user.id, session.id)
                    .expect("Query failed").expect("Session not found");
                assert!(done.completed);

                let task = db.get_task(user.id, task.id).expect("Query failed").unwrap();
                assert_eq!(task.focus_time, 25);
                assert_eq!(task.pomodoro_count, 1);
            }

            it "closes a still-open focus period cleanly" {
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                let period = db.start_focus(user.id, StartFocusInput {
                    session_id: session.id,
                }).expect("Failed to start focus");

                db.complete_pomodoro(user.id, session.id).expect("Query failed");

                let period = db.get_focus_period(user.id, period.id)
                    .expect("Query failed").unwrap();
                assert!(period.end_time.is_some());
                assert!(!period.is_interrupted);
            }

            it "conflicts on an already-closed session" {
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                db.end_pomodoro(user.id, session.id).expect("Query failed");

                let result = db.complete_pomodoro(user.id, session.id);
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }
        }

        describe "end_pomodoro" {
            it "closes the session without the roll-up" {
                let task = create_test_task(&db, user.id);
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: Some(task.id),
                    duration_minutes: 25,
                }).expect("Failed to create");

                let ended = db.end_pomodoro(user.id, session.id)
                    .expect("Query failed").expect("Session not found");
                assert!(!ended.completed);
                assert!(ended.completed_at.is_some());

                let task = db.get_task(user.id, task.id).expect("Query failed").unwrap();
                assert_eq!(task.focus_time, 0);
                assert_eq!(task.pomodoro_count, 0);
            }

            it "marks an open focus period as interrupted" {
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                let period = db.start_focus(user.id, StartFocusInput {
                    session_id: session.id,
                }).expect("Failed to start focus");

                db.end_pomodoro(user.id, session.id).expect("Query failed");

                let period = db.get_focus_period(user.id, period.id)
                    .expect("Query failed").unwrap();
                assert!(period.is_interrupted);
            }
        }

        describe "get_pomodoro_stats" {
            it "only counts completed sessions toward the minute total" {
                let first = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                db.complete_pomodoro(user.id, first.id).expect("Query failed");

                let second = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 50,
                }).expect("Failed to create");
                db.end_pomodoro(user.id, second.id).expect("Query failed");

                let stats = db.get_pomodoro_stats(user.id).expect("Query failed");
                assert_eq!(stats.total_sessions, 2);
                assert_eq!(stats.completed_sessions, 1);
                assert_eq!(stats.total_minutes, 25);
            }
        }
    }

    describe "focus_periods" {
        describe "start_focus" {
            it "conflicts while another period is open in the session" {
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");

                db.start_focus(user.id, StartFocusInput { session_id: session.id })
                    .expect("Failed to start focus");
                let result = db.start_focus(user.id, StartFocusInput { session_id: session.id });
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }

            it "rejects a session belonging to someone else" {
                let bob = create_test_user(&db, "bob");
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");

                let result = db.start_focus(bob.id, StartFocusInput { session_id: session.id });
                assert!(matches!(result, Err(AppError::NotFound(_))));
            }
        }

        describe "end_focus" {
            it "records the duration and interruption flag" {
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                let period = db.start_focus(user.id, StartFocusInput {
                    session_id: session.id,
                }).expect("Failed to start focus");

                let closed = db.end_focus(user.id, period.id, true)
                    .expect("Query failed").expect("Period not found");
                assert!(closed.end_time.is_some());
                assert_eq!(closed.duration_min, Some(0));
                assert!(closed.is_interrupted);
            }

            it "conflicts on a period that is already closed" {
                let session = db.create_pomodoro(user.id, CreatePomodoroInput {
                    task_id: None,
                    duration_minutes: 25,
                }).expect("Failed to create");
                let period = db.start_focus(user.id, StartFocusInput {
                    session_id: session.id,
                }).expect("Failed to start focus");
                db.end_focus(user.id, period.id, false).expect("Query failed");

                let result = db.end_focus(user.id, period.id, false);
                assert!(matches!(result, Err(AppError::Conflict(_))));
            }
        }
    }

    describe "brieflogs" {
        describe "create_brieflog" {
            it "rejects empty content" {
                let task = create_test_task(&db, user.id);
                let result = db.create_brieflog(user.id, CreateBriefLogInput {
                    task_id: task.id,
                    brief_type: BriefType::Reflection,
                    content: "  ".to_string(),
                });
                assert!(matches!(result, Err(AppError::Validation(_))));
            }

            it "accepts a soft-deleted task" {
                let task = create_test_task(&db, user.id);
                db.soft_delete_task(user.id, task.id, None).expect("Query failed");

                let result = db.create_brieflog(user.id, CreateBriefLogInput {
                    task_id: task.id,
                    brief_type: BriefType::Reflection,
                    content: "Posthumous note".to_string(),
                });
                assert!(result.is_ok());
            }
        }

        describe "list_problematic_brieflogs" {
            it "returns only types 1 through 4 inside the range" {
                let task = create_test_task(&db, user.id);
                for brief_type in [
                    BriefType::DeleteReason,
                    BriefType::PriorityChange,
                    BriefType::Reflection,
                    BriefType::Other,
                ] {
                    db.create_brieflog(user.id, CreateBriefLogInput {
                        task_id: task.id,
                        brief_type,
                        content: "x".to_string(),
                    }).expect("Failed to create log");
                }

                let start = Utc::now() - Duration::hours(1);
                let end = Utc::now() + Duration::hours(1);
                let logs = db.list_problematic_brieflogs(user.id, start, end)
                    .expect("Query failed");
                assert_eq!(logs.len(), 2);
                assert!(logs.iter().all(|l| l.brief_type.is_problematic()));
            }
        }
    }
}

#[test]
fn data_survives_reopening_the_database() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("pomotrack.db");

    let user_id = {
        let db = Database::open(path.clone()).expect("Failed to open database");
        db.migrate().expect("Failed to run migrations");
        let user = create_test_user(&db, "alice");
        create_test_task(&db, user.id);
        user.id
    };

    let db = Database::open(path).expect("Failed to reopen database");
    db.migrate().expect("Failed to run migrations");
    let tasks = db.list_tasks(user_id).expect("Query failed");
    assert_eq!(tasks.len(), 1);
}
