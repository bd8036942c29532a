// Comment counter listener - keeps users.comment_total in step with
// comment events from the bus

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domains::user::service::UserService;
use crate::error::AppResult;
use crate::models::{CommentEvent, Envelope};

/// Applies one event. A deletion lowers the total of every author whose
/// comments went away, not only the caller's.
pub async fn apply_comment_event(users: &UserService, event: &CommentEvent) -> AppResult<()> {
    match event {
        CommentEvent::Created(created) => users.adjust_comment_total(created.user_id, 1).await,
        CommentEvent::Deleted(deleted) => {
            if deleted.removed_by_author.is_empty() {
                return users
                    .adjust_comment_total(deleted.user_id, -deleted.effect_num)
                    .await;
            }
            for (author_id, count) in &deleted.removed_by_author {
                users.adjust_comment_total(*author_id, -count).await?;
            }
            Ok(())
        }
    }
}

pub fn spawn_comment_counter_listener(
    mut receiver: broadcast::Receiver<Envelope>,
    users: UserService,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Comment counter listener started");
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    if let Err(e) = apply_comment_event(&users, &envelope.payload).await {
                        error!(routing_key = %envelope.routing_key, "failed to apply comment event: {}", e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "comment counter listener lagged, events lost");
                }
                Err(RecvError::Closed) => {
                    info!("Event bus closed, comment counter listener stopping");
                    break;
                }
            }
        }
    })
}
