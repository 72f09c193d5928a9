// Incremental technical indicators over a candle stream.
//
// Semantics follow the usual pandas-style definitions: EMA seeded with the
// first observation (adjust=False), Wilder smoothing for RSI and ADX, and a
// simple-moving-average signal line for the stochastic oscillator. Each
// struct is fed one bar at a time and returns its current value.

use std::collections::VecDeque;

/// Fixed-capacity rolling window of f64 values.
#[derive(Debug, Clone)]
struct Window {
    cap: usize,
    buf: VecDeque<f64>,
}

impl Window {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: VecDeque::with_capacity(cap),
        }
    }

    fn push(&mut self, v: f64) {
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(v);
    }

    fn min(&self) -> f64 {
        self.buf.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn max(&self) -> f64 {
        self.buf.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn mean(&self) -> f64 {
        if self.buf.is_empty() {
            0.0
        } else {
            self.buf.iter().sum::<f64>() / self.buf.len() as f64
        }
    }
}

/// Exponential moving average, seeded with the first observation.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: f64,
    seeded: bool,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            value: 0.0,
            seeded: false,
        }
    }

    pub fn update(&mut self, price: f64) -> f64 {
        if self.seeded {
            self.value += self.alpha * (price - self.value);
        } else {
            self.value = price;
            self.seeded = true;
        }
        self.value
    }
}

/// MACD histogram: (EMA_fast - EMA_slow) - signal line.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    /// Feed one close, return the histogram value.
    pub fn update(&mut self, close: f64) -> f64 {
        let line = self.fast.update(close) - self.slow.update(close);
        line - self.signal.update(line)
    }
}

/// Relative strength index with Wilder smoothing. Neutral (50) until the
/// first price delta arrives.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    seen: usize,
    value: f64,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            seen: 0,
            value: 50.0,
        }
    }

    pub fn update(&mut self, close: f64) -> f64 {
        let Some(prev) = self.prev.replace(close) else {
            return self.value;
        };
        let delta = close - prev;
        let (gain, loss) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        self.seen += 1;
        if self.seen <= self.period {
            // Running mean until the first full period.
            self.avg_gain += (gain - self.avg_gain) / self.seen as f64;
            self.avg_loss += (loss - self.avg_loss) / self.seen as f64;
        } else {
            let alpha = 1.0 / self.period as f64;
            self.avg_gain += alpha * (gain - self.avg_gain);
            self.avg_loss += alpha * (loss - self.avg_loss);
        }
        self.value = if self.avg_loss <= f64::EPSILON {
            if self.avg_gain <= f64::EPSILON {
                50.0
            } else {
                100.0
            }
        } else {
            100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
        };
        self.value
    }
}

/// Stochastic oscillator signal line: %K over `period` highs/lows smoothed
/// with an SMA of `smooth` values. Returns 50 while the range is degenerate.
#[derive(Debug, Clone)]
pub struct Stochastic {
    highs: Window,
    lows: Window,
    signal: Window,
}

impl Stochastic {
    pub fn new(period: usize, smooth: usize) -> Self {
        Self {
            highs: Window::new(period),
            lows: Window::new(period),
            signal: Window::new(smooth),
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> f64 {
        self.highs.push(high);
        self.lows.push(low);
        let hh = self.highs.max();
        let ll = self.lows.min();
        let range = hh - ll;
        let k = if range > 0.0 {
            (close - ll) / range * 100.0
        } else {
            50.0
        };
        self.signal.push(k);
        self.signal.mean()
    }
}

/// Average directional index, Wilder smoothing throughout. Zero until the
/// initial accumulation phases complete (one seed bar + `period` directional
/// bars + `period` DX values).
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    tr_s: f64,
    plus_s: f64,
    minus_s: f64,
    bars: usize,
    dx_sum: f64,
    dx_seen: usize,
    value: f64,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            tr_s: 0.0,
            plus_s: 0.0,
            minus_s: 0.0,
            bars: 0,
            dx_sum: 0.0,
            dx_seen: 0,
            value: 0.0,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> f64 {
        let Some((ph, pl, pc)) = self.prev.replace((high, low, close)) else {
            return self.value;
        };

        let tr = (high - low).max((high - pc).abs()).max((low - pc).abs());
        let up_move = high - ph;
        let down_move = pl - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };

        self.bars += 1;
        if self.bars <= self.period {
            self.tr_s += tr;
            self.plus_s += plus_dm;
            self.minus_s += minus_dm;
            if self.bars < self.period {
                return self.value;
            }
        } else {
            self.tr_s += tr - self.tr_s / self.period as f64;
            self.plus_s += plus_dm - self.plus_s / self.period as f64;
            self.minus_s += minus_dm - self.minus_s / self.period as f64;
        }

        let dx = if self.tr_s > f64::EPSILON {
            let di_plus = 100.0 * self.plus_s / self.tr_s;
            let di_minus = 100.0 * self.minus_s / self.tr_s;
            let di_sum = di_plus + di_minus;
            if di_sum > f64::EPSILON {
                100.0 * (di_plus - di_minus).abs() / di_sum
            } else {
                0.0
            }
        } else {
            0.0
        };

        if self.dx_seen < self.period {
            self.dx_sum += dx;
            self.dx_seen += 1;
            if self.dx_seen == self.period {
                self.value = self.dx_sum / self.period as f64;
            }
        } else {
            self.value = (self.value * (self.period as f64 - 1.0) + dx) / self.period as f64;
        }
        self.value
    }
}
