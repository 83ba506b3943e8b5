use crate::Result;
use crate::callbacks::Callback;
use crate::llm::Message;
use async_trait::async_trait;
use std::io::Write;
use tracing::debug;

/// Writes a markdown transcript of the conversation, one section per step.
///
/// Only messages added since the previous step are written. If the history
/// was rewritten in between (shorter, or a different prefix) the whole
/// history is written again under a marker.
pub struct MessageLogger<W: Write + Send> {
    last_hashes: Vec<u64>,
    writer: W,
    step: u32,
}

impl<W: Write + Send> MessageLogger<W> {
    pub fn new(name: &str, mut writer: W) -> Result<Box<Self>> {
        write!(writer, "## {}\n\n", name)?;

        Ok(Box::new(Self {
            last_hashes: Vec::new(),
            writer,
            step: 0,
        }))
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn display_messages(&mut self, messages: &[Message]) -> Result<()> {
        write!(self.writer, "### Step {}\n\n", self.step)?;

        messages
            .iter()
            .try_for_each(|m| write!(self.writer, "{}", m))?;

        write!(self.writer, "---\n\n")?;

        Ok(())
    }

    fn display_history_cleared(&mut self) -> Result<()> {
        write!(self.writer, "## [HISTORY CLEARED]\n\n")?;
        Ok(())
    }

    fn prefix_match_len(&self, new_hashes: &[u64]) -> usize {
        new_hashes
            .iter()
            .zip(self.last_hashes.iter())
            .take_while(|&(a, b)| *a == *b)
            .count()
    }
}

#[async_trait]
impl<W: Write + Send> Callback for MessageLogger<W> {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        let new_hashes = messages.iter().map(Message::get_hash).collect::<Vec<_>>();

        if new_hashes.len() < self.last_hashes.len()
            || self.prefix_match_len(&new_hashes) != self.last_hashes.len()
        {
            self.display_history_cleared()?;
            self.display_messages(&messages)?;
        } else {
            self.display_messages(&messages[self.last_hashes.len()..])?;
        }

        self.writer.flush()?;
        debug!(step = self.step, messages = messages.len(), "transcript updated");

        self.step += 1;
        self.last_hashes = new_hashes;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::MessageLogger;
    use crate::Result;
    use crate::callbacks::Callback;
    use crate::llm::Message;

    #[tokio::test]
    async fn test_logger_writes_only_new_messages() -> Result<()> {
        let mut logger = MessageLogger::new("task", Vec::new())?;

        let mut history = vec![Message::User("research rust".to_string())];
        history = logger.call(history).await?;
        history.push(Message::Assistant("done".to_string(), vec![]));
        logger.call(history).await?;

        let logger = *logger;
        let out = String::from_utf8(logger.into_inner()).expect("utf8 transcript");

        assert!(out.starts_with("## task\n\n### Step 0\n\n"));
        assert_eq!(out.matches("research rust").count(), 1);
        assert!(out.contains("### Step 1\n\n**assistant**\n\ndone"));
        assert!(!out.contains("HISTORY CLEARED"));

        Ok(())
    }

    #[tokio::test]
    async fn test_logger_rewrites_after_history_change() -> Result<()> {
        let mut logger = MessageLogger::new("task", Vec::new())?;

        logger
            .call(vec![
                Message::User("a".to_string()),
                Message::Assistant("b".to_string(), vec![]),
            ])
            .await?;
        logger.call(vec![Message::User("c".to_string())]).await?;

        let logger = *logger;
        let out = String::from_utf8(logger.into_inner()).expect("utf8 transcript");
        assert!(out.contains("## [HISTORY CLEARED]\n\n### Step 1"));

        Ok(())
    }
}
