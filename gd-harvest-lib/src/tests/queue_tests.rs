use std::collections::HashSet;

use super::*;

fn game(n: usize) -> GameTask {
    GameTask::new(format!(
        "http://archive.test/mlb/year_2016/month_06/day_01/gid_2016_06_01_game_{n}/"
    ))
    .unwrap()
}

async fn drain_with(workers: usize, tasks: usize) -> Vec<GameTask> {
    let queue = TaskQueue::new();
    let producer = queue.producer();
    for n in 0..tasks {
        producer.push(game(n)).unwrap();
    }

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let consumer = queue.consumer();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while let QueueItem::Task(task) = consumer.pop().await {
                    seen.push(task);
                }
                seen
            })
        })
        .collect();

    queue.push_sentinels(workers).unwrap();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    assert!(queue.is_empty(), "every sentinel is consumed");
    all
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_workers_terminate_and_no_task_repeats() {
    for workers in [1, 2, 3, 8] {
        for tasks in [0, 1, 7, 50] {
            let processed = drain_with(workers, tasks).await;
            assert_eq!(processed.len(), tasks, "workers={workers} tasks={tasks}");
            let unique: HashSet<_> = processed.iter().collect();
            assert_eq!(unique.len(), tasks);
        }
    }
}

#[tokio::test]
async fn test_fifo_order_for_single_consumer() {
    let queue = TaskQueue::new();
    let producer = queue.producer();
    producer.push(game(1)).unwrap();
    producer.push(game(2)).unwrap();
    queue.push_sentinels(1).unwrap();
    assert_eq!(queue.len(), 3);

    let consumer = queue.consumer();
    assert_eq!(consumer.pop().await, QueueItem::Task(game(1)));
    assert_eq!(consumer.pop().await, QueueItem::Task(game(2)));
    assert_eq!(consumer.pop().await, QueueItem::Done);
}
