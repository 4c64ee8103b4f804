//! 数独任务：求解固定的简单题目，适应度 = 满足约束的单元（行/列/宫）占比

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::task::python::{find_entry_point, strip_code_fences, PythonRunner};
use crate::task::{EvalContext, Task, TaskError};

const HARNESS: &str = r#"
import copy

def _run(ns, entry, board):
    return ns[entry](copy.deepcopy(board))
"#;

/// 0 表示空格
const PUZZLE: [[u8; 9]; 9] = [
    [5, 3, 0, 0, 7, 0, 0, 0, 0],
    [6, 0, 0, 1, 9, 5, 0, 0, 0],
    [0, 9, 8, 0, 0, 0, 0, 6, 0],
    [8, 0, 0, 0, 6, 0, 0, 0, 3],
    [4, 0, 0, 8, 0, 3, 0, 0, 1],
    [7, 0, 0, 0, 2, 0, 0, 0, 6],
    [0, 6, 0, 0, 0, 0, 2, 8, 0],
    [0, 0, 0, 4, 1, 9, 0, 0, 5],
    [0, 0, 0, 0, 8, 0, 0, 7, 9],
];

/// 返回值不是 9 行列表时的得分
const WRONG_FORMAT_SCORE: f64 = 0.1;

/// 一个单元合法：恰好 9 个整数，且为 1..=9 各一次
fn is_valid_unit<'a>(cells: impl IntoIterator<Item = &'a Value>) -> bool {
    let digits: Vec<i64> = cells.into_iter().filter_map(Value::as_i64).collect();
    digits.len() == 9
        && digits.iter().all(|d| (1..=9).contains(d))
        && digits.iter().collect::<HashSet<_>>().len() == 9
}

pub(crate) fn score_board(board: &Value) -> Result<f64, TaskError> {
    let rows = match board.as_array() {
        Some(rows) if rows.len() == 9 => rows,
        _ => return Ok(WRONG_FORMAT_SCORE),
    };
    let grid = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_array()
                .filter(|cells| cells.len() >= 9)
                .ok_or_else(|| TaskError::WrongOutput(format!("row {i} is not a list of 9 cells")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut satisfied = 0;
    for row in &grid {
        satisfied += usize::from(is_valid_unit(row.iter()));
    }
    for col in 0..9 {
        satisfied += usize::from(is_valid_unit(grid.iter().map(|row| &row[col])));
    }
    for box_row in (0..9).step_by(3) {
        for box_col in (0..9).step_by(3) {
            let cells = (0..9).map(|k| &grid[box_row + k / 3][box_col + k % 3]);
            satisfied += usize::from(is_valid_unit(cells));
        }
    }
    Ok(satisfied as f64 / 27.0)
}

pub struct SudokuTask {
    runner: PythonRunner,
}

impl SudokuTask {
    pub fn new(runner: PythonRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Task for SudokuTask {
    fn name(&self) -> &str {
        "SudokuSolver"
    }

    fn description(&self) -> &str {
        "Write a function `solve_sudoku(board)` that solves a 9x9 Sudoku grid. The board is a list of lists of integers, where 0 represents an empty cell. The function should return the solved board."
    }

    async fn evaluate(&self, code: &str, ctx: &EvalContext) -> Result<f64, TaskError> {
        let code = strip_code_fences(code);
        let entry = find_entry_point(&code, Some("solve"))?;
        let board = self
            .runner
            .run(HARNESS, &code, &entry, json!(PUZZLE), ctx)
            .await?;
        score_board(&board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLUTION: [[u8; 9]; 9] = [
        [5, 3, 4, 6, 7, 8, 9, 1, 2],
        [6, 7, 2, 1, 9, 5, 3, 4, 8],
        [1, 9, 8, 3, 4, 2, 5, 6, 7],
        [8, 5, 9, 7, 6, 1, 4, 2, 3],
        [4, 2, 6, 8, 5, 3, 7, 9, 1],
        [7, 1, 3, 9, 2, 4, 8, 5, 6],
        [9, 6, 1, 5, 3, 7, 2, 8, 4],
        [2, 8, 7, 4, 1, 9, 6, 3, 5],
        [3, 4, 5, 2, 8, 6, 1, 7, 9],
    ];

    #[test]
    fn test_solved_board_is_perfect() {
        assert_eq!(score_board(&json!(SOLUTION)).unwrap(), 1.0);
    }

    #[test]
    fn test_unsolved_puzzle_scores_zero() {
        // 原题每个单元都有空格
        assert_eq!(score_board(&json!(PUZZLE)).unwrap(), 0.0);
    }

    #[test]
    fn test_wrong_format() {
        assert_eq!(score_board(&Value::Null).unwrap(), WRONG_FORMAT_SCORE);
        assert_eq!(score_board(&json!([[1, 2, 3]])).unwrap(), WRONG_FORMAT_SCORE);
        let short_rows = json!([[1, 2], [1], [1], [1], [1], [1], [1], [1], [1]]);
        assert!(matches!(score_board(&short_rows), Err(TaskError::WrongOutput(_))));
    }

    #[test]
    fn test_partial_solution() {
        // 同一宫内交换第一行两个格子：行与宫仍合法，只破坏两列
        let mut board = SOLUTION;
        board[0].swap(0, 1);
        let score = score_board(&json!(board)).unwrap();
        assert!((score - 25.0 / 27.0).abs() < 1e-9);
    }
}
