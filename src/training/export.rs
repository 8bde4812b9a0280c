//! CSV exports for offline analysis.

use std::fs;
use std::path::Path;

use crate::ai::{AgentStats, Experience};
use crate::error::ExportError;

fn create_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write one row per agent: `AgentID,Fitness,Wins,Losses,Draws`.
pub fn write_population_stats<'a>(
    path: &Path,
    agents: impl IntoIterator<Item = &'a AgentStats>,
) -> Result<usize, ExportError> {
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["AgentID", "Fitness", "Wins", "Losses", "Draws"])?;

    let mut rows = 0;
    for agent in agents {
        wtr.write_record(&[
            agent.id.to_string(),
            format!("{:.3}", agent.fitness),
            agent.wins.to_string(),
            agent.losses.to_string(),
            agent.draws.to_string(),
        ])?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

/// Write one row per experience: `Move,Reward,Result`.
pub fn write_training_data<'a>(
    path: &Path,
    experiences: impl IntoIterator<Item = &'a Experience>,
) -> Result<usize, ExportError> {
    create_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Move", "Reward", "Result"])?;

    let mut rows = 0;
    for exp in experiences {
        wtr.write_record(&[
            exp.mv.to_string(),
            format!("{:.3}", exp.reward),
            exp.result.to_string(),
        ])?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Agent, MatchOutcome, NetworkConfig};
    use crate::game::{HexCoord, Move, Outcome, Piece, PieceType, Side};

    #[test]
    fn test_population_stats_csv() {
        let config = NetworkConfig {
            layer_sizes: vec![4, 3, 2],
            learning_rate: 0.01,
            seed: 1,
        };
        let mut a = Agent::new(0, &config, 1).unwrap();
        a.record(MatchOutcome::Win);
        a.record(MatchOutcome::Draw);
        let b = Agent::new(7, &config, 2).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats").join("population.csv");
        let rows = write_population_stats(&path, &[a.stats(), b.stats()]).unwrap();
        assert_eq!(rows, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "AgentID,Fitness,Wins,Losses,Draws");
        assert_eq!(lines[1], "0,1.500,1,0,1");
        assert_eq!(lines[2], "7,0.000,0,0,0");
    }

    #[test]
    fn test_training_data_csv() {
        let exp = Experience {
            state_before: vec![0.0],
            mv: Move::place(Piece::new(PieceType::Queen, Side::White, 1), HexCoord::ORIGIN),
            state_after: vec![0.0],
            reward: 0.98765,
            result: Outcome::Win(Side::White),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training_data.csv");
        write_training_data(&path, [&exp]).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "Move");
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "White QUEEN from reserve to (0,0)");
        assert_eq!(&row[1], "0.988");
        assert_eq!(&row[2], "WHITE_WIN");
    }

    #[test]
    fn test_export_to_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.csv");
        assert!(write_training_data(&path, std::iter::empty()).is_err());
    }
}
